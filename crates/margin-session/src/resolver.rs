// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module path resolution (CommonJS rules).
//!
//! A specifier either resolves to an absolute path on disk (a user module)
//! or it does not, in which case it is treated as a host built-in. Relative
//! and absolute specifiers that fail to resolve are errors; bare specifiers
//! that fail the `node_modules` walk are built-ins by definition.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{EvalError, Result};

/// Result of module resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A user module on disk (absolute, canonical path)
    User(PathBuf),
    /// A built-in module handled by the host registry
    BuiltIn(String),
}

/// Module resolver implementing the CommonJS algorithm.
#[derive(Debug)]
pub struct ModuleResolver {
    /// File extensions to try, in order
    extensions: Vec<&'static str>,
}

impl ModuleResolver {
    /// Creates a new module resolver.
    pub fn new() -> Self {
        Self {
            extensions: vec![".js", ".ts", ".jsx", ".tsx", ".json"],
        }
    }

    /// Resolves a specifier relative to the importing module.
    pub fn resolve(&self, specifier: &str, importer: &Path) -> Result<Resolution> {
        // `node:` always names a built-in
        if let Some(name) = specifier.strip_prefix("node:") {
            return Ok(Resolution::BuiltIn(name.to_string()));
        }

        if specifier.starts_with("./")
            || specifier.starts_with("../")
            || specifier.starts_with('/')
            || (cfg!(windows) && specifier.chars().nth(1) == Some(':'))
        {
            return self
                .resolve_file(specifier, importer)
                .map(Resolution::User)
                .ok_or_else(|| EvalError::Resolve {
                    specifier: specifier.to_string(),
                    importer: importer.to_path_buf(),
                });
        }

        // Bare specifier: a package under node_modules, or a built-in
        Ok(match self.resolve_node_modules(specifier, importer) {
            Some(path) => Resolution::User(path),
            None => Resolution::BuiltIn(specifier.to_string()),
        })
    }

    /// Resolves a relative or absolute file specifier.
    fn resolve_file(&self, specifier: &str, importer: &Path) -> Option<PathBuf> {
        let base = if Path::new(specifier).is_absolute() {
            PathBuf::from(specifier)
        } else {
            importer.parent().unwrap_or(Path::new(".")).join(specifier)
        };

        self.resolve_path(&base)
    }

    /// Tries a path as given, with extension inference, then as a directory.
    fn resolve_path(&self, path: &Path) -> Option<PathBuf> {
        if path.is_file() {
            return Some(canonical(path));
        }

        for ext in &self.extensions {
            let mut with_ext = path.as_os_str().to_os_string();
            with_ext.push(ext);
            let with_ext = PathBuf::from(with_ext);
            if with_ext.is_file() {
                return Some(canonical(&with_ext));
            }
        }

        if path.is_dir() {
            return self.resolve_directory(path);
        }

        None
    }

    /// Resolves a directory through `package.json` "main" or an index file.
    fn resolve_directory(&self, dir: &Path) -> Option<PathBuf> {
        let package_json = dir.join("package.json");
        if package_json.is_file() {
            if let Ok(content) = std::fs::read_to_string(&package_json) {
                if let Ok(pkg) = serde_json::from_str::<PackageJson>(&content) {
                    if let Some(main) = pkg.main {
                        if let Some(resolved) = self.resolve_path(&dir.join(main)) {
                            return Some(resolved);
                        }
                    }
                }
            }
        }

        for ext in &self.extensions {
            let index = dir.join(format!("index{}", ext));
            if index.is_file() {
                return Some(canonical(&index));
            }
        }

        None
    }

    /// Walks up the directory tree looking for `node_modules/<package>`.
    fn resolve_node_modules(&self, specifier: &str, importer: &Path) -> Option<PathBuf> {
        let (package_name, subpath) = parse_package_specifier(specifier);

        let mut current = importer.parent();
        while let Some(dir) = current {
            let package_dir = dir.join("node_modules").join(package_name);
            if package_dir.exists() {
                let resolved = match subpath {
                    Some(sub) => self.resolve_path(&package_dir.join(sub)),
                    None => self.resolve_directory(&package_dir),
                };
                if resolved.is_some() {
                    return resolved;
                }
            }
            current = dir.parent();
        }

        None
    }
}

impl Default for ModuleResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Splits a package specifier into name and optional subpath.
fn parse_package_specifier(specifier: &str) -> (&str, Option<&str>) {
    if let Some(rest) = specifier.strip_prefix('@') {
        // Scoped package: @scope/name or @scope/name/subpath
        if let Some(slash) = rest.find('/') {
            let after_scope = &rest[slash + 1..];
            if let Some(sub) = after_scope.find('/') {
                let name_end = 1 + slash + 1 + sub;
                return (&specifier[..name_end], Some(&specifier[name_end + 1..]));
            }
        }
        (specifier, None)
    } else {
        match specifier.find('/') {
            Some(slash) => (&specifier[..slash], Some(&specifier[slash + 1..])),
            None => (specifier, None),
        }
    }
}

/// Minimal package.json structure for resolution.
#[derive(Debug, Deserialize)]
struct PackageJson {
    main: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_parse_package_specifier() {
        assert_eq!(parse_package_specifier("lodash"), ("lodash", None));
        assert_eq!(
            parse_package_specifier("lodash/get"),
            ("lodash", Some("get"))
        );
        assert_eq!(parse_package_specifier("@types/node"), ("@types/node", None));
        assert_eq!(
            parse_package_specifier("@babel/core/lib/index"),
            ("@babel/core", Some("lib/index"))
        );
    }

    #[test]
    fn test_bare_unresolved_is_builtin() {
        let resolver = ModuleResolver::new();
        let importer = PathBuf::from("/definitely/not/on/disk/app.js");
        assert_eq!(
            resolver.resolve("fs", &importer).unwrap(),
            Resolution::BuiltIn("fs".into())
        );
        assert_eq!(
            resolver.resolve("node:path", &importer).unwrap(),
            Resolution::BuiltIn("path".into())
        );
    }

    #[test]
    fn test_relative_missing_is_an_error() {
        let resolver = ModuleResolver::new();
        let importer = PathBuf::from("/definitely/not/on/disk/app.js");
        assert!(matches!(
            resolver.resolve("./missing", &importer),
            Err(EvalError::Resolve { .. })
        ));
    }

    #[test]
    fn test_extension_inference_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("lib.js"), "export const v = 1;").unwrap();
        fs::create_dir(root.join("pkg")).unwrap();
        fs::write(root.join("pkg/index.ts"), "export const w = 2;").unwrap();

        let resolver = ModuleResolver::new();
        let importer = root.join("app.js");

        match resolver.resolve("./lib", &importer).unwrap() {
            Resolution::User(path) => assert!(path.ends_with("lib.js")),
            other => panic!("expected user module, got {:?}", other),
        }
        match resolver.resolve("./pkg", &importer).unwrap() {
            Resolution::User(path) => assert!(path.ends_with("index.ts")),
            other => panic!("expected user module, got {:?}", other),
        }
    }

    #[test]
    fn test_node_modules_walk() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let pkg = root.join("node_modules/leftpad");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(pkg.join("package.json"), r#"{ "main": "lib/pad.js" }"#).unwrap();
        fs::create_dir_all(pkg.join("lib")).unwrap();
        fs::write(pkg.join("lib/pad.js"), "module.exports = 1;").unwrap();
        fs::create_dir_all(root.join("src/deep")).unwrap();

        let resolver = ModuleResolver::new();
        let importer = root.join("src/deep/app.js");
        match resolver.resolve("leftpad", &importer).unwrap() {
            Resolution::User(path) => assert!(path.ends_with("pad.js")),
            other => panic!("expected user module, got {:?}", other),
        }
    }
}
