//! File-name classification for the artifact viewer.

use crate::model::FileCategory;

pub const BINARY_EXTENSIONS: &[&str] = &[
    "pkl", "pickle", "joblib", "h5", "hdf5", "pb", "onnx", "bin", "exe", "dll", "so", "dylib",
];

const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "json", "yaml", "yml", "xml", "html", "css", "js", "ts", "jsx", "tsx", "py",
    "java", "c", "cpp", "h", "hpp", "cs", "php", "rb", "go", "rs", "swift", "sql", "sh", "bash",
    "ps1", "bat", "log", "csv", "ini", "cfg", "conf", "env", "dockerfile", "makefile", "cmake",
    "gradle", "maven", "pom",
];

const SPECIAL_TEXT_FILES: &[&str] = &["Dockerfile", "Makefile", "README", "LICENSE", ".env", ".gitignore"];

/// MLflow model descriptor; has no extension but is always YAML.
pub const MLMODEL: &str = "MLmodel";

/// Lowercased text after the last `.`, or empty if there is none.
pub fn file_extension(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((_, ext)) => ext.to_lowercase(),
        None => String::new(),
    }
}

pub fn is_binary_file(name: &str) -> bool {
    let ext = file_extension(name);
    BINARY_EXTENSIONS.contains(&ext.as_str())
}

pub fn is_text_file(name: &str, is_binary: bool) -> bool {
    if name == MLMODEL {
        return true;
    }
    if is_binary {
        return false;
    }
    let ext = file_extension(name);
    if !ext.is_empty() && TEXT_EXTENSIONS.contains(&ext.as_str()) {
        return true;
    }
    SPECIAL_TEXT_FILES.contains(&name)
}

pub fn file_category(name: &str) -> FileCategory {
    match file_extension(name).as_str() {
        "pkl" | "pickle" | "joblib" | "h5" | "hdf5" | "pb" | "onnx" => FileCategory::Model,
        "log" | "txt" => FileCategory::Log,
        "json" | "yaml" | "yml" => FileCategory::Config,
        "png" | "jpg" | "jpeg" | "gif" | "svg" => FileCategory::Image,
        _ => FileCategory::Other,
    }
}

/// Limits applied before a file's content is fetched for preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewPolicy {
    pub max_bytes: u64,
}

impl Default for PreviewPolicy {
    fn default() -> Self {
        Self { max_bytes: 1024 * 1024 }
    }
}

impl PreviewPolicy {
    pub fn should_load(&self, name: &str, is_binary: bool, size: Option<u64>) -> bool {
        if name == MLMODEL {
            return true;
        }
        if is_binary || size.is_some_and(|s| s > self.max_bytes) {
            return false;
        }
        is_text_file(name, is_binary)
    }
}

/// [`PreviewPolicy::should_load`] with the default limits.
pub fn should_load_content(name: &str, is_binary: bool, size: Option<u64>) -> bool {
    PreviewPolicy::default().should_load(name, is_binary, size)
}
