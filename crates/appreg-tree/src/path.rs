//! Stable addressing of cached nodes.
//!
//! A path names a node by the application it belongs to plus the
//! `(kind, local value)` of each step below the application root. Paths
//! survive node replacement, which is what makes them usable across the
//! mutation protocol's refresh step.

use appreg_core::ObjectId;

use crate::node::NodeKind;

/// One step below the application root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathSegment {
    pub kind: NodeKind,
    pub value: Option<String>,
}

/// Path of a node. An empty segment list addresses the application root
/// node itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodePath {
    pub app: ObjectId,
    pub segments: Vec<PathSegment>,
}

impl NodePath {
    /// Path of an application root node.
    #[must_use]
    pub fn application(app: ObjectId) -> Self {
        Self {
            app,
            segments: Vec::new(),
        }
    }

    /// Appends a segment without a local value (groups, singletons).
    #[must_use]
    pub fn child(&self, kind: NodeKind) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment { kind, value: None });
        Self {
            app: self.app,
            segments,
        }
    }

    /// Appends a segment with a local value (collection entries).
    #[must_use]
    pub fn child_value(&self, kind: NodeKind, value: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment {
            kind,
            value: Some(value.into()),
        });
        Self {
            app: self.app,
            segments,
        }
    }

    /// The containing path, or `None` for an application root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            app: self.app,
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// The final segment, or `None` for an application root.
    #[must_use]
    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    /// Kind of the addressed node.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.last().map_or(NodeKind::Application, |s| s.kind)
    }

    #[must_use]
    pub fn is_application_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl std::fmt::Display for NodePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.app)?;
        for segment in &self.segments {
            match &segment.value {
                Some(value) => write!(f, "/{}:{}", segment.kind, value)?,
                None => write!(f, "/{}", segment.kind)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_walks_back_to_the_root() {
        let app = ObjectId::new();
        let role = NodePath::application(app)
            .child(NodeKind::AppRoleGroup)
            .child_value(NodeKind::AppRole, "some-id");

        let group = role.parent().unwrap();
        assert_eq!(group.kind(), NodeKind::AppRoleGroup);

        let root = group.parent().unwrap();
        assert!(root.is_application_root());
        assert_eq!(root.kind(), NodeKind::Application);
        assert!(root.parent().is_none());
    }

    #[test]
    fn test_display_names_kinds_and_values() {
        let app = ObjectId::new();
        let path = NodePath::application(app).child_value(NodeKind::RedirectUri, "https://x/cb");
        assert_eq!(format!("{path}"), format!("{app}/redirectUri:https://x/cb"));
    }
}
