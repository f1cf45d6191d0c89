/// A path in the virtual tree built over a flat bucket.
///
/// Virtual paths are stored in their store key form: segments
/// separated by `/`, without leading or trailing separator and
/// without empty segments. The empty key is the root.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VirtualPath(String);

impl VirtualPath {
    /// The root of the tree.
    pub fn root() -> VirtualPath {
        VirtualPath(String::new())
    }

    /// Build a path from a store key, such as the filename of a
    /// document.
    ///
    /// The empty string is rejected here; use [VirtualPath::root] for
    /// the root.
    pub fn parse(key: impl Into<String>) -> Result<VirtualPath, PathError> {
        let key = key.into();
        check_key(&key)?;

        Ok(VirtualPath(key))
    }

    /// Build a path from its mounted form, rooted at `/`.
    ///
    /// `/` is the root, `/a/b` is the path `a/b`.
    pub fn from_rooted(path: &str) -> Result<VirtualPath, PathError> {
        let rest = path.strip_prefix('/').ok_or(PathError::NotRooted)?;
        if rest.is_empty() {
            return Ok(VirtualPath::root());
        }

        VirtualPath::parse(rest)
    }

    /// Return the path of the child `name` of this directory.
    ///
    /// `name` must be a single, non-empty segment.
    pub fn join(&self, name: &str) -> Result<VirtualPath, PathError> {
        check_name(name)?;
        if self.is_root() {
            return Ok(VirtualPath(name.to_string()));
        }

        let mut key = String::with_capacity(self.0.len() + 1 + name.len());
        key.push_str(&self.0);
        key.push('/');
        key.push_str(name);
        Ok(VirtualPath(key))
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The last segment of the path, empty for the root.
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// The parent of the path, None for the root.
    pub fn parent(&self) -> Option<VirtualPath> {
        if self.is_root() {
            return None;
        }
        Some(match self.0.rfind('/') {
            Some(slash) => VirtualPath(self.0[0..slash].to_string()),
            None => VirtualPath::root(),
        })
    }

    /// The segments of the path, none for the root.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// The flat key this path is stored under.
    pub fn as_store_key(&self) -> &str {
        &self.0
    }

    /// The prefix shared by the store keys of all descendants.
    ///
    /// This is `""` for the root, which matches every key.
    pub fn children_prefix(&self) -> String {
        if self.is_root() {
            return String::new();
        }

        format!("{}/", self.0)
    }
}

impl std::fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "/{}", self.0)
    }
}

/// Convert a `(parent, name)` pair into a flat store key.
///
/// `parent` is in its mounted form, starting with `/`.
pub fn to_store_key(parent: &str, name: &str) -> Result<String, PathError> {
    let path = VirtualPath::from_rooted(parent)?.join(name)?;

    Ok(path.0)
}

/// Split a store key into its segments.
pub fn segments_of(key: &str) -> Result<Vec<String>, PathError> {
    let path = VirtualPath::parse(key)?;

    Ok(path.segments().map(|s| s.to_string()).collect())
}

fn check_name(name: &str) -> Result<(), PathError> {
    if name.is_empty() || name.contains('/') {
        return Err(PathError::InvalidName(name.to_string()));
    }

    Ok(())
}

fn check_key(key: &str) -> Result<(), PathError> {
    if key.is_empty() || key.split('/').any(|s| s.is_empty()) {
        return Err(PathError::InvalidPath(key.to_string()));
    }

    Ok(())
}

/// Errors returned by path functions
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PathError {
    #[error("invalid path {0:?}: segments must be non-empty and separated by a single /")]
    InvalidPath(String),

    #[error("invalid name {0:?}: names must be non-empty and not contain /")]
    InvalidName(String),

    #[error("path must start with /")]
    NotRooted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_key_from_root() -> anyhow::Result<()> {
        assert_eq!("ffff", to_store_key("/", "ffff")?);

        Ok(())
    }

    #[test]
    fn store_key_from_subdir() -> anyhow::Result<()> {
        assert_eq!("asdf/zzzz", to_store_key("/asdf", "zzzz")?);
        assert_eq!("aaa/bbb/ccc/ddd", to_store_key("/aaa/bbb/ccc", "ddd")?);

        Ok(())
    }

    #[test]
    fn store_key_rejects_bad_input() {
        assert_eq!(Err(PathError::NotRooted), to_store_key("asdf", "zzzz"));
        assert_eq!(Err(PathError::NotRooted), to_store_key("", "zzzz"));
        assert!(matches!(
            to_store_key("/asdf", ""),
            Err(PathError::InvalidName(_))
        ));
        assert!(matches!(
            to_store_key("/asdf", "a/b"),
            Err(PathError::InvalidName(_))
        ));
        assert!(matches!(
            to_store_key("/asdf//qwer", "zzzz"),
            Err(PathError::InvalidPath(_))
        ));
    }

    #[test]
    fn segments_follow_store_key() -> anyhow::Result<()> {
        let key = to_store_key("/aaa/bbb/ccc", "ddd")?;
        assert_eq!(vec!["aaa", "bbb", "ccc", "ddd"], segments_of(&key)?);
        assert_eq!(vec!["ffff"], segments_of(&to_store_key("/", "ffff")?)?);

        Ok(())
    }

    #[test]
    fn segments_of_empty_key() {
        assert!(matches!(segments_of(""), Err(PathError::InvalidPath(_))));
        assert!(matches!(segments_of("a//b"), Err(PathError::InvalidPath(_))));
    }

    #[test]
    fn rooted_form() -> anyhow::Result<()> {
        assert_eq!(VirtualPath::root(), VirtualPath::from_rooted("/")?);
        assert_eq!(VirtualPath::parse("a/b")?, VirtualPath::from_rooted("/a/b")?);
        assert_eq!("/a/b", VirtualPath::parse("a/b")?.to_string());
        assert_eq!("/", VirtualPath::root().to_string());

        Ok(())
    }

    #[test]
    fn name_and_parent() -> anyhow::Result<()> {
        let path = VirtualPath::parse("a/b/c")?;
        assert_eq!("c", path.name());
        assert_eq!(Some(VirtualPath::parse("a/b")?), path.parent());
        assert_eq!(Some(VirtualPath::root()), VirtualPath::parse("a")?.parent());
        assert_eq!(None, VirtualPath::root().parent());
        assert_eq!("", VirtualPath::root().name());

        Ok(())
    }

    #[test]
    fn children_prefix() -> anyhow::Result<()> {
        assert_eq!("", VirtualPath::root().children_prefix());
        assert_eq!("a/b/", VirtualPath::parse("a/b")?.children_prefix());

        Ok(())
    }

    #[test]
    fn segments() -> anyhow::Result<()> {
        assert_eq!(
            vec!["a", "b"],
            VirtualPath::parse("a/b")?.segments().collect::<Vec<_>>()
        );
        assert_eq!(0, VirtualPath::root().segments().count());

        Ok(())
    }
}
