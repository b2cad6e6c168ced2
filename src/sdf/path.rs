use std::fmt;

use anyhow::{ensure, Result};

/// Build a [Path] from a full path string, e.g. `/World/Mesh.points`.
#[inline]
pub fn path(str: impl AsRef<str>) -> Path {
    Path::parse(str.as_ref())
}

/// Scene path split into a prim part and an optional property part.
///
/// # Syntax
/// - A slash ("/") following an identifier introduces a namespace child.
/// - A period (".") following an identifier introduces a property.
/// - A property may contain non-sequential colons (':') to namespace
///   within properties, but may not begin or end with a colon.
///
/// The element name is the last appended component (a prim name for prim
/// paths, a property name for property paths). The absolute root is
/// `("/", "")`; a default-constructed path is empty and invalid.
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path {
    prim_part: String,
    prop_part: String,
    element: String,
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prim_part)?;
        if !self.prop_part.is_empty() {
            write!(f, ".{}", self.prop_part)?;
        }

        Ok(())
    }
}

impl Path {
    pub fn new(prim: impl Into<String>, prop: impl Into<String>) -> Self {
        let prim = prim.into();
        let prop: String = prop.into();

        let element = if !prop.is_empty() {
            prop.clone()
        } else if prim == "/" {
            String::new()
        } else {
            prim.rsplit('/').next().unwrap_or_default().to_string()
        };

        Path {
            prim_part: prim,
            prop_part: prop,
            element,
        }
    }

    /// Split a full path string at the property separator.
    pub fn parse(full: &str) -> Self {
        match full.split_once('.') {
            Some((prim, prop)) => Path::new(prim, prop),
            None => Path::new(full, ""),
        }
    }

    /// The absolute root path `/`.
    #[inline]
    pub fn abs_root() -> Self {
        Path::new("/", "")
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.prim_part.is_empty() && self.prop_part.is_empty()
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.prim_part == "/" && self.prop_part.is_empty()
    }

    #[inline]
    pub fn is_abs(&self) -> bool {
        self.prim_part.starts_with('/')
    }

    #[inline]
    pub fn is_property_path(&self) -> bool {
        !self.prop_part.is_empty()
    }

    #[inline]
    pub fn prim_part(&self) -> &str {
        &self.prim_part
    }

    #[inline]
    pub fn prop_part(&self) -> &str {
        &self.prop_part
    }

    /// Name of the last appended component.
    #[inline]
    pub fn element_name(&self) -> &str {
        &self.element
    }

    /// Full path string, `prim_part` + "." + `prop_part` for properties.
    pub fn full_path(&self) -> String {
        self.to_string()
    }

    /// Append a prim (namespace child) component.
    pub fn append_element(&self, token: &str) -> Result<Path> {
        ensure!(!token.is_empty(), "Element name cannot be empty");
        ensure!(
            !self.is_property_path(),
            "Cannot append element '{token}' to property path {self}"
        );

        let prim = if self.prim_part == "/" {
            format!("/{token}")
        } else {
            format!("{}/{token}", self.prim_part)
        };

        Ok(Path {
            prim_part: prim,
            prop_part: String::new(),
            element: token.to_string(),
        })
    }

    /// Append a property component.
    pub fn append_property(&self, name: &str) -> Result<Path> {
        ensure!(!name.is_empty(), "Property name cannot be empty");
        ensure!(name != ".", "Property name cannot be '.'");
        ensure!(
            !self.is_property_path(),
            "Cannot append property '{name}' to property path {self}"
        );

        Ok(Path {
            prim_part: self.prim_part.clone(),
            prop_part: name.to_string(),
            element: name.to_string(),
        })
    }

    /// The path with any property part stripped.
    pub fn parent_prim_path(&self) -> Path {
        Path::new(self.prim_part.clone(), "")
    }

    /// Validate identifier
    ///
    /// Rules are:
    /// - Must be at least 1 char
    /// - Must start with a letter or underscore
    /// - Must contain only letters, underscores, and numbers.
    pub fn is_valid_identifier(name: &str) -> bool {
        if name.is_empty() {
            return false;
        }

        name.chars()
            .enumerate()
            .all(|(i, c)| c == '_' || if i == 0 { c.is_alphabetic() } else { c.is_alphanumeric() })
    }

    /// Property names may namespace identifiers with ':'.
    pub fn is_valid_namespace_identifier(name: &str) -> bool {
        name.split(':').all(Self::is_valid_identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root() {
        let root = Path::abs_root();
        assert!(root.is_root());
        assert!(root.is_abs());
        assert!(!root.is_empty());
        assert_eq!(root.element_name(), "");
        assert_eq!(root.full_path(), "/");

        assert!(Path::default().is_empty());
        assert!(!Path::default().is_root());
    }

    #[test]
    fn test_append_element() -> Result<()> {
        let world = Path::abs_root().append_element("World")?;
        assert_eq!(world.full_path(), "/World");
        assert_eq!(world.element_name(), "World");

        let mesh = world.append_element("Mesh")?;
        assert_eq!(mesh.full_path(), "/World/Mesh");
        assert_eq!(mesh.element_name(), "Mesh");
        assert_eq!(mesh.prim_part(), "/World/Mesh");
        assert!(!mesh.is_property_path());

        Ok(())
    }

    #[test]
    fn test_append_property() -> Result<()> {
        let base = Path::abs_root().append_element("foo")?;

        let prop = base.append_property("prop")?;
        assert_eq!(prop.full_path(), "/foo.prop");
        assert_eq!(prop.prim_part(), "/foo");
        assert_eq!(prop.prop_part(), "prop");
        assert_eq!(prop.element_name(), "prop");
        assert!(prop.is_property_path());

        let namespaced = base.append_property("prop:foo:bar")?;
        assert_eq!(namespaced.full_path(), "/foo.prop:foo:bar");
        assert_eq!(namespaced.prop_part(), "prop:foo:bar");

        // Appending to a property path is invalid.
        assert!(prop.append_property("other").is_err());
        assert!(prop.append_element("other").is_err());

        Ok(())
    }

    #[test]
    fn test_parse() {
        #[rustfmt::skip]
        let cases = [
            ("/A/B/C", "/A/B/C", "", "C"),
            ("/A/B/C.foo", "/A/B/C", "foo", "foo"),
            ("/A/B/C.foo:bar:baz", "/A/B/C", "foo:bar:baz", "foo:bar:baz"),
            ("/", "/", "", ""),
        ];

        for (full, prim, prop, element) in cases {
            let path = path(full);
            assert_eq!(path.prim_part(), prim, "prim part of {full}");
            assert_eq!(path.prop_part(), prop, "prop part of {full}");
            assert_eq!(path.element_name(), element, "element of {full}");
            assert_eq!(path.full_path(), full);
        }
    }

    #[test]
    fn test_parent_prim_path() {
        assert_eq!(path("/A/B.attr").parent_prim_path(), path("/A/B"));
        assert_eq!(path("/A/B").parent_prim_path(), path("/A/B"));
    }

    #[test]
    fn validate_identifier() {
        // Valid identifiers
        assert!(Path::is_valid_identifier("_"));
        assert!(Path::is_valid_identifier("x"));
        assert!(Path::is_valid_identifier("_1"));
        assert!(Path::is_valid_identifier("test123"));
        assert!(Path::is_valid_identifier("TEST"));

        // Invalid ones
        assert!(!Path::is_valid_identifier(""));
        assert!(!Path::is_valid_identifier(" "));
        assert!(!Path::is_valid_identifier("1"));
        assert!(!Path::is_valid_identifier("x!"));
        assert!(!Path::is_valid_identifier("te st"));
        assert!(!Path::is_valid_identifier("te:st"));

        assert!(Path::is_valid_namespace_identifier("xformOp:translate"));
        assert!(!Path::is_valid_namespace_identifier(":translate"));
        assert!(!Path::is_valid_namespace_identifier("translate:"));
    }
}
