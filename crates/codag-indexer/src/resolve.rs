//! Import source → repository file resolution

use codag_core::Language;
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

/// Extensions tried, in order, when an import names a module without one.
pub const CANDIDATE_EXTENSIONS: [&str; 17] = [
    "ts", "tsx", "js", "jsx", "mjs", "cjs", "py", "go", "rs", "java", "swift", "lua", "c", "h", "cpp", "cc",
    "hpp",
];

/// Files that stand for their directory.
pub const INDEX_FILES: [&str; 6] = ["index.ts", "index.tsx", "index.js", "index.jsx", "__init__.py", "mod.rs"];

/// Roots bare module names are tried against, besides the importer's directory.
const SOURCE_ROOTS: [&str; 5] = ["", "src", "lib", "app", "src/main/java"];

/// Resolves import sources against a fixed set of repository-relative paths.
#[derive(Debug, Clone, Default)]
pub struct ModuleResolver {
    files: BTreeSet<PathBuf>,
    dirs: BTreeSet<PathBuf>,
}

impl ModuleResolver {
    pub fn new<I, P>(files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let files: BTreeSet<PathBuf> = files.into_iter().map(|p| normalize(p.as_ref())).collect();
        let dirs = files
            .iter()
            .filter_map(|f| f.parent())
            .filter(|d| !d.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .collect();
        ModuleResolver { files, dirs }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains(&normalize(path))
    }

    /// Files an import of `source` from `importer` refers to. Empty when the
    /// source is external or unknown.
    pub fn resolve(&self, importer: &Path, source: &str) -> Vec<PathBuf> {
        let importer = normalize(importer);
        let dir = importer.parent().map(Path::to_path_buf).unwrap_or_default();
        let language = Language::from_path(&importer);

        let found = if source.starts_with("./") || source.starts_with("../") {
            self.locate(&dir.join(source))
        } else if language == Some(Language::Python) && source.starts_with('.') {
            self.python_relative(&dir, source)
        } else if let Some(rest) = source.strip_prefix("crate::") {
            self.locate(&crate_root(&importer).join(rust_path(rest)))
        } else if source == "crate" {
            self.locate_rust_crate_root(&importer)
        } else if source == "super" || source.starts_with("super::") {
            let parent = rust_module_dir(&importer).parent().map(Path::to_path_buf).unwrap_or_default();
            let rest = source.strip_prefix("super").unwrap_or("").trim_start_matches("::");
            self.locate(&parent.join(rust_path(rest)))
        } else if let Some(rest) = source.strip_prefix("self::") {
            self.locate(&rust_module_dir(&importer).join(rust_path(rest)))
        } else if let Some(rest) = source.strip_prefix("@/").or_else(|| source.strip_prefix("~/")) {
            self.locate(&Path::new("src").join(rest))
        } else {
            self.bare(&dir, source, language)
        };

        self.with_implementations(found)
    }

    /// Normalised path if `path` (or an extension/index variant of it) is a known file or package.
    fn locate(&self, base: &Path) -> Vec<PathBuf> {
        let base = normalize(base);
        if base.as_os_str().is_empty() {
            return Vec::new();
        }
        if self.files.contains(&base) {
            return vec![base];
        }

        // `./client.js` written for a `client.ts` source file.
        let stem = match base.extension().and_then(|e| e.to_str()) {
            Some("js" | "jsx" | "mjs" | "cjs") => base.with_extension(""),
            _ => base.clone(),
        };
        for ext in CANDIDATE_EXTENSIONS {
            let candidate = append_extension(&stem, ext);
            if self.files.contains(&candidate) {
                return vec![candidate];
            }
        }
        for index in INDEX_FILES {
            let candidate = base.join(index);
            if self.files.contains(&candidate) {
                return vec![candidate];
            }
        }
        Vec::new()
    }

    /// `.x`, `..pkg.y`, `.` from a Python module.
    fn python_relative(&self, dir: &Path, source: &str) -> Vec<PathBuf> {
        let dots = source.chars().take_while(|c| *c == '.').count();
        let mut base = dir.to_path_buf();
        for _ in 1..dots {
            base.pop();
        }
        let rest = &source[dots..];
        if rest.is_empty() {
            return self.locate(&base);
        }
        self.locate(&base.join(rest.replace('.', "/")))
    }

    fn locate_rust_crate_root(&self, importer: &Path) -> Vec<PathBuf> {
        let root = crate_root(importer);
        for entry in ["lib.rs", "main.rs"] {
            let candidate = root.join(entry);
            if self.files.contains(&candidate) {
                return vec![candidate];
            }
        }
        Vec::new()
    }

    fn bare(&self, dir: &Path, source: &str, language: Option<Language>) -> Vec<PathBuf> {
        let mut forms = vec![source.to_string()];
        if source.contains("::") {
            forms.push(rust_path(source));
        } else if !source.contains('/') && source.contains('.') && !looks_like_file(source) {
            forms.push(source.replace('.', "/"));
        }

        for form in &forms {
            let found = self.locate(&dir.join(form));
            if !found.is_empty() {
                return found;
            }
            for root in SOURCE_ROOTS {
                let found = self.locate(&Path::new(root).join(form));
                if !found.is_empty() {
                    return found;
                }
            }
        }

        if language == Some(Language::Go) {
            return self.go_package(source);
        }
        Vec::new()
    }

    /// A Go import path names a directory; match the longest known directory
    /// that the path ends with.
    fn go_package(&self, source: &str) -> Vec<PathBuf> {
        let matched = self
            .dirs
            .iter()
            .filter(|dir| {
                let dir = to_slash(dir);
                source == dir || source.ends_with(&format!("/{}", dir))
            })
            .max_by_key(|dir| dir.components().count());
        let Some(package) = matched else {
            return Vec::new();
        };
        self.files
            .iter()
            .filter(|f| f.parent() == Some(package.as_path()))
            .filter(|f| f.extension().is_some_and(|e| e == "go"))
            .cloned()
            .collect()
    }

    /// A C/C++ header also brings in its implementation files.
    fn with_implementations(&self, mut found: Vec<PathBuf>) -> Vec<PathBuf> {
        let headers: Vec<PathBuf> = found
            .iter()
            .filter(|f| f.extension().is_some_and(|e| e == "h" || e == "hpp"))
            .cloned()
            .collect();
        for header in headers {
            for ext in ["c", "cc", "cpp"] {
                let candidate = header.with_extension(ext);
                if self.files.contains(&candidate) && !found.contains(&candidate) {
                    found.push(candidate);
                }
            }
        }
        found
    }
}

/// Lexically resolve `.` and `..` segments.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Forward-slash form of a path, used for ids and suffix matching.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => s.to_str(),
            Component::RootDir => Some(""),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn append_extension(base: &Path, ext: &str) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

fn looks_like_file(source: &str) -> bool {
    Path::new(source)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| CANDIDATE_EXTENSIONS.contains(&ext))
}

fn rust_path(path: &str) -> String {
    path.replace("::", "/")
}

/// Directory containing the crate root: everything up to `src`.
fn crate_root(importer: &Path) -> PathBuf {
    let mut root = PathBuf::new();
    for component in importer.components() {
        root.push(component.as_os_str());
        if component.as_os_str() == "src" {
            return root;
        }
    }
    PathBuf::from("src")
}

/// Directory holding the submodules of the module defined by `importer`.
fn rust_module_dir(importer: &Path) -> PathBuf {
    let dir = importer.parent().map(Path::to_path_buf).unwrap_or_default();
    match importer.file_stem().and_then(|s| s.to_str()) {
        Some("mod" | "lib" | "main") | None => dir,
        Some(stem) => dir.join(stem),
    }
}
