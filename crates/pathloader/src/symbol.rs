//! Symbol names and their decomposition into path segments.

use std::path::MAIN_SEPARATOR_STR;

/// Separator between namespace segments in a symbol name.
pub const NAMESPACE_SEPARATOR: char = '\\';

/// Secondary separator folded into directories by the hierarchical convention.
pub const UNDERSCORE: char = '_';

/// A fully qualified symbol name such as `Vendor\Lib\Sub\Class`.
///
/// Leading namespace separators are not significant: `\Foo\Bar` and
/// `Foo\Bar` name the same symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolName<'a> {
    raw: &'a str,
}

impl<'a> SymbolName<'a> {
    pub fn new(name: &'a str) -> Self {
        Self {
            raw: name.trim_start_matches(NAMESPACE_SEPARATOR),
        }
    }

    /// The name with leading separators removed.
    pub fn as_str(&self) -> &'a str {
        self.raw
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Namespace segments, split on `\` only.
    pub fn segments(&self) -> Vec<&'a str> {
        self.raw.split(NAMESPACE_SEPARATOR).collect()
    }

    /// Segments under the hierarchical convention.
    ///
    /// The final segment is additionally split on `_`, so `Foo\Bar_Baz`
    /// yields `["Foo", "Bar", "Baz"]`. Underscores in earlier segments are
    /// part of the directory name and stay untouched.
    pub fn hierarchical_segments(&self) -> Vec<&'a str> {
        let mut parts = self.segments();
        if let Some(last) = parts.pop() {
            parts.extend(last.split(UNDERSCORE));
        }
        parts
    }

    /// The hierarchical segments joined back with `\`.
    ///
    /// This is the string base path namespaces are matched against.
    pub fn canonical(&self) -> String {
        self.hierarchical_segments().join("\\")
    }

    /// Relative file name (without extension) under the hierarchical convention.
    pub fn hierarchical_path(&self) -> String {
        relative_path(&self.hierarchical_segments())
    }
}

impl std::fmt::Display for SymbolName<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.raw)
    }
}

/// Join segments with the platform directory separator.
pub fn relative_path(segments: &[&str]) -> String {
    segments.join(MAIN_SEPARATOR_STR)
}

/// Convert the namespace separators of a name fragment into directory separators.
pub fn namespace_to_path(fragment: &str) -> String {
    fragment.replace(NAMESPACE_SEPARATOR, MAIN_SEPARATOR_STR)
}
