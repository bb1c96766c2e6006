use std::fs;
use std::path::Path;

use crate::core::{PrecompileError, Result};

/// Extension of gno source files
pub const GNO_EXTENSION: &str = ".gno";

/// Build tag selecting the gno build configuration
pub const GNO_BUILD_TAG: &str = "gno";

const FILETEST_SUFFIX: &str = "_filetest.gno";
const TEST_SUFFIX: &str = "_test.gno";

/// Classification of a gno file, derived from its name only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Normal,
    Test,
    FileTest,
}

impl FileKind {
    pub fn from_name(name: &str) -> Self {
        // `_filetest` must win over `_test`
        if name.ends_with(FILETEST_SUFFIX) {
            FileKind::FileTest
        } else if name.ends_with(TEST_SUFFIX) {
            FileKind::Test
        } else {
            FileKind::Normal
        }
    }

    pub fn is_test(self) -> bool {
        !matches!(self, FileKind::Normal)
    }
}

/// A gno source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub body: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
        }
    }

    /// Read a file from disk, keeping only its base name
    pub fn read(path: &Path) -> Result<Self> {
        let body = fs::read_to_string(path).map_err(|e| PrecompileError::io(path, e))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, body })
    }

    pub fn kind(&self) -> FileKind {
        FileKind::from_name(&self.name)
    }

    pub fn is_gno(&self) -> bool {
        is_gno_file(&self.name)
    }
}

/// In-memory package: an ordered list of files
#[derive(Debug, Clone, Default)]
pub struct MemPackage {
    pub name: String,
    pub path: String,
    pub files: Vec<SourceFile>,
}

impl MemPackage {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            files: Vec::new(),
        }
    }

    pub fn with_file(mut self, name: impl Into<String>, body: impl Into<String>) -> Self {
        self.files.push(SourceFile::new(name, body));
        self
    }

    /// Load every regular file directly inside `dir`, sorted by name
    pub fn read_dir(dir: &Path) -> Result<Self> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                let io = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
                PrecompileError::io(dir, io)
            })?;
            if entry.file_type().is_file() {
                files.push(SourceFile::read(entry.path())?);
            }
        }

        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            name,
            path: dir.display().to_string(),
            files,
        })
    }
}

pub fn is_gno_file(name: &str) -> bool {
    name.ends_with(GNO_EXTENSION)
}

/// Name and build tags of the Go file generated from a gno file
pub fn generated_name_and_tags(gno_file_path: &str) -> (String, String) {
    let base = Path::new(gno_file_path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| gno_file_path.to_string());
    let stem = base.strip_suffix(GNO_EXTENSION).unwrap_or(&base);

    match FileKind::from_name(gno_file_path) {
        FileKind::FileTest => (
            format!(".{}.gno.gen.go", stem),
            format!("{} && filetest", GNO_BUILD_TAG),
        ),
        FileKind::Test => (
            format!(".{}.gno.gen_test.go", stem),
            format!("{} && test", GNO_BUILD_TAG),
        ),
        FileKind::Normal => (format!("{}.gno.gen.go", stem), GNO_BUILD_TAG.to_string()),
    }
}
