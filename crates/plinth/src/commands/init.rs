//! Scaffold a starter source tree.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Files written by `plinth init`, relative to the project root.
const STARTER_FILES: &[(&str, &str)] = &[
    ("plinth.toml", DEFAULT_CONFIG),
    ("src/pages/index.hbs", DEFAULT_INDEX),
    ("src/components/header/header.hbs", DEFAULT_HEADER),
    ("src/styles/main/main.scss", DEFAULT_MAIN_SCSS),
    ("src/styles/main/_vars.scss", DEFAULT_VARS_SCSS),
    ("src/scripts/main/main.js", DEFAULT_MAIN_JS),
    ("src/scripts/main/_util.js", DEFAULT_UTIL_JS),
    ("src/data/site.json", DEFAULT_SITE_DATA),
];

const STARTER_DIRS: &[&str] = &["src/assets/fonts", "src/assets/img"];

/// Run the init command in the current directory.
pub async fn run(yes: bool) -> Result<()> {
    tracing::info!("Initializing plinth...");
    scaffold(Path::new("."), yes)?;
    tracing::info!("Initialization complete!");
    tracing::info!("Run 'plinth --dev --config plinth.toml' to start developing.");
    Ok(())
}

/// Write the starter tree under `root`. Existing files are kept unless `overwrite`.
pub fn scaffold(root: &Path, overwrite: bool) -> Result<()> {
    for dir in STARTER_DIRS {
        fs::create_dir_all(root.join(dir))
            .with_context(|| format!("Failed to create {}", dir))?;
    }

    for (rel, content) in STARTER_FILES {
        let path = root.join(rel);
        if path.exists() && !overwrite {
            tracing::warn!("{} already exists. Use --yes to overwrite.", rel);
            continue;
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, content).with_context(|| format!("Failed to write {}", rel))?;
        tracing::info!("Created {}", rel);
    }

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# Plinth configuration

[paths]
source = "src"
build = "build"

[server]
port = 3000
open = false

[styles]
browsers = ["defaults"]

[scripts]
target = "es2015"

[data]
firstName = "Your variables go here"
"#;

const DEFAULT_INDEX: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{{site.title}}</title>
  <link rel="stylesheet" href="/css/main.css">
</head>
<body>
  {{> header}}
  <main>
    <p>Hello, {{firstName}}.</p>
    {{{markdown site.intro}}}
  </main>
  <script src="/js/main.js"></script>
</body>
</html>
"#;

const DEFAULT_HEADER: &str = r#"<header class="site-header">
  <a href="/">{{site.title}}</a>
</header>
"#;

const DEFAULT_MAIN_SCSS: &str = r#"@import "vars";

body {
  margin: 0;
  font-family: $font-stack;
  color: $text;
}

.site-header {
  display: flex;
  padding: $gap;
  background: $brand;
  user-select: none;

  a {
    color: #fff;
    text-decoration: none;
  }
}
"#;

const DEFAULT_VARS_SCSS: &str = r#"$font-stack: system-ui, sans-serif;
$brand: #2f5d8a;
$text: #1d1d1f;
$gap: 1rem;
"#;

const DEFAULT_MAIN_JS: &str = r#"import { greet } from './_util';

document.addEventListener('DOMContentLoaded', () => {
  console.log(greet('plinth'));
});
"#;

const DEFAULT_UTIL_JS: &str = r#"export const greet = (name) => `Hello from ${name}`;
"#;

const DEFAULT_SITE_DATA: &str = r#"{
  "title": "My Site",
  "intro": "Edit **src/pages/index.hbs** to get started."
}
"#;
