use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;

#[derive(Debug, Clone, Hash, PartialOrd, Ord)]
/// A path inside a store without a current directory. It is always normalized and valid Unicode:
/// no leading or trailing separator, no `.` or `..` segments and `/` as the only separator.
pub struct VirtualPath(String);

impl VirtualPath {
    /// The root of the store.
    pub fn root() -> Self {
        VirtualPath(String::new())
    }

    /// Checks whether the path points to the root of the store.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The path one level up, `None` for the root.
    pub fn parent(&self) -> Option<VirtualPath> {
        match self.0.rfind('/') {
            _ if self.is_root() => None,
            Some(index) => Some(VirtualPath(self.0[..index].to_string())),
            None => Some(VirtualPath::root()),
        }
    }

    /// The normalized path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The prefix every path below this one starts with.
    pub fn child_prefix(&self) -> String {
        match self.is_root() {
            true => String::new(),
            false => format!("{}/", self.0),
        }
    }

    /// Checks whether `other` lies strictly below this path.
    pub fn is_ancestor_of(&self, other: &VirtualPath) -> bool {
        other.0.len() > self.0.len() && other.0.starts_with(&self.child_prefix())
    }
}

impl From<&str> for VirtualPath {
    fn from(path: &str) -> Self {
        let mut parts: Vec<&str> = Vec::new();
        for component in path.split(|c| c == '/' || c == '\\') {
            match component {
                "" | "." => {}
                ".." => {
                    parts.pop();
                }
                value => parts.push(value),
            }
        }
        VirtualPath(parts.join("/"))
    }
}

impl From<&Path> for VirtualPath {
    fn from(path: &Path) -> Self {
        VirtualPath::from(&*path.to_string_lossy())
    }
}

impl AsRef<str> for VirtualPath {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for VirtualPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

impl<T> PartialEq<T> for VirtualPath
where
    T: AsRef<str>,
{
    fn eq(&self, other: &T) -> bool {
        self.0.as_str() == other.as_ref()
    }
}

impl Eq for VirtualPath {}
