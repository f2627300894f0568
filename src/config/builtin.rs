// src/config/builtin.rs

//! Pipeline definition used when no `Assetdag.toml` is present.
//!
//! Style compilation, font conversion, script bundling and image compression
//! are delegated to the usual command-line tools (`sass`, `ttf2woff2`,
//! `esbuild`, `imagemin`), which must be on `PATH`. Styles and scripts are
//! compiled from a generated entry that pulls in every non-partial input,
//! so the result holds all of them in source order.

pub const BUILTIN_CONFIG: &str = r#"
[config]
triggered_while_running_behaviour = "queue"
queue_length = 1

[paths]
src = "src"
dest = "dist"

[server]
host = "127.0.0.1"
port = 3000

[task.clean]
kind = "clean"

[task.markup]
kind = "include"
src = ["src/*.html"]
dest = "dist"
prefix = "@@"
collapse_whitespace = true
watch = ["src/**/*.html"]

[task.styles]
kind = "command"
mode = "once"
cmd = "sass --style=compressed --source-map {entry} {output}"
src = ["src/assets/style/**/*.scss"]
entry_line = '@use "{input}" as s{index};'
dest = "dist/assets/style"
output = "style.min.css"
watch = ["src/assets/style/**/*.scss"]

[task.images]
kind = "copy"
src = ["src/assets/images/static/**/*"]
dest = "dist/assets/images"
watch = ["src/assets/images/**/*.{jpg,jpeg,png}"]

[task.sprite]
kind = "sprite"
src = ["src/assets/images/icons/**/*.svg"]
dest = "dist/assets/images/sprite"
output = "sprite.svg"
watch = ["src/assets/images/**/*.svg"]

[task.fonts]
kind = "command"
mode = "each"
cmd = "ttf2woff2 < {input} > {output}"
src = ["src/assets/fonts/*.ttf"]
dest = "dist/assets/fonts"
extension = "woff2"
watch = ["src/assets/fonts/*.ttf"]

[task.scripts]
kind = "command"
mode = "once"
cmd = "esbuild {entry} --bundle --minify --sourcemap --outfile={output}"
src = ["src/assets/js/**/*.js"]
entry_line = 'import "{input}";'
dest = "dist/assets/js"
output = "main.js"
on_error = "continue"
watch = ["src/assets/js/**/*.js"]

[task.images-compress]
kind = "command"
mode = "each"
cmd = "imagemin {input} > {output}"
src = ["dist/assets/images/**/*.{gif,jpg,jpeg,png,svg}"]
dest = "dist/images"

[pipeline.default]
steps = [
    "clean",
    { parallel = ["markup", "fonts", "styles", "images", "sprite", "scripts"] },
]
watch = true
serve = true

[pipeline.build]
steps = [
    "clean",
    { parallel = ["markup", "scripts", "fonts", "images"] },
    "styles",
    "images-compress",
]
"#;
