//! Descriptors: parsed world/robot description files.
//!
//! A [`Descriptor`] is one markup file (`.world`, `.sdf`, `.urdf`,
//! `.xacro`, and by extension `package.xml` manifests and COLLADA meshes)
//! reduced to a small owned element tree. Only the parts needed to follow
//! references are kept: element names, attributes and direct text.

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use thiserror::Error;

use crate::config::{ExtensionSet, descriptor_extensions};

static DESCRIPTOR_EXTENSIONS: LazyLock<ExtensionSet> = LazyLock::new(descriptor_extensions);

#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {}: {message}", path.display())]
    Markup { path: PathBuf, message: String },
}

/// One element of a parsed descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    leading_text: bool,
    children: Vec<Element>,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Result<Self, quick_xml::Error> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            text: String::new(),
            leading_text: false,
            children: Vec::new(),
        })
    }

    /// Qualified element name as written (`xacro:include`, `plugin`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name without a namespace prefix.
    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Direct text content, trimmed. `None` when the element has none.
    pub fn text(&self) -> Option<&str> {
        let text = self.text.trim();
        (!text.is_empty()).then_some(text)
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// First direct child with the given name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Whether any character data, whitespace included, precedes the
    /// first child element. `<a>\n</a>` has text, `<a><b/></a>` does not.
    pub fn has_text(&self) -> bool {
        self.leading_text
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if self.children.is_empty() {
            self.leading_text = true;
        }
        self.text.push_str(text);
    }

    /// All elements below this one in document order, excluding `self`.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: self.children.iter().rev().collect(),
        }
    }
}

/// Pre-order iterator over an element's descendants.
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.children.iter().rev());
        Some(next)
    }
}

/// A parsed descriptor file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    path: PathBuf,
    root: Element,
}

impl Descriptor {
    /// Read and parse a file.
    pub fn open(path: &Path) -> Result<Self, DescriptorError> {
        let text = fs::read_to_string(path).map_err(|source| DescriptorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &text)
    }

    /// Parse markup text; `path` is recorded for diagnostics only.
    pub fn parse(path: &Path, text: &str) -> Result<Self, DescriptorError> {
        let markup_error = |message: String| DescriptorError::Markup {
            path: path.to_path_buf(),
            message,
        };

        let mut reader = Reader::from_str(text);

        let mut open: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader.read_event().map_err(|e| markup_error(e.to_string()))?;
            match event {
                Event::Start(start) => {
                    if root.is_some() && open.is_empty() {
                        return Err(markup_error("multiple root elements".to_string()));
                    }
                    let element =
                        Element::from_start(&start).map_err(|e| markup_error(e.to_string()))?;
                    open.push(element);
                }
                Event::Empty(start) => {
                    let element =
                        Element::from_start(&start).map_err(|e| markup_error(e.to_string()))?;
                    match open.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None if root.is_none() => root = Some(element),
                        None => return Err(markup_error("multiple root elements".to_string())),
                    }
                }
                Event::End(_) => {
                    let element = open
                        .pop()
                        .ok_or_else(|| markup_error("unexpected closing tag".to_string()))?;
                    match open.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => root = Some(element),
                    }
                }
                Event::Text(text) => {
                    if let Some(current) = open.last_mut() {
                        let text = text.unescape().map_err(|e| markup_error(e.to_string()))?;
                        current.push_text(&text);
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = open.last_mut() {
                        let raw = data.into_inner();
                        let text: Cow<'_, str> = String::from_utf8_lossy(&raw);
                        current.push_text(&text);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(unclosed) = open.last() {
            return Err(markup_error(format!("unclosed element <{}>", unclosed.name)));
        }

        let root = root.ok_or_else(|| markup_error("no root element".to_string()))?;
        Ok(Self {
            path: path.to_path_buf(),
            root,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Every `filename` attribute value below the root, in document order.
    pub fn reference_attributes(&self) -> impl Iterator<Item = &str> {
        self.root.descendants().filter_map(|e| e.attr("filename"))
    }

    /// Every element below the root with the given qualified name.
    pub fn find_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.root.descendants().filter(move |e| e.name == name)
    }

    /// Every element below the root with the given local name, ignoring
    /// namespace prefixes.
    pub fn find_all_local<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.root.descendants().filter(move |e| e.local_name() == name)
    }

    /// Direct `child` elements of every `parent` element below the root.
    pub fn find_children<'a>(
        &'a self,
        parent: &'a str,
        child: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.find_all(parent)
            .flat_map(move |p| p.children.iter().filter(move |c| c.name == child))
    }
}

/// Whether `path` names a file that is itself a descriptor to follow.
pub fn is_descriptor(path: &Path) -> bool {
    DESCRIPTOR_EXTENSIONS.contains(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Descriptor {
        Descriptor::parse(Path::new("test.urdf"), text).unwrap()
    }

    #[test]
    fn collects_filename_attributes_in_document_order() {
        let desc = parse(
            r#"<robot name="r" xmlns:xacro="http://ros.org/wiki/xacro">
                <xacro:include filename="$(find foo_pkg)/urdf/base.xacro"/>
                <link name="base">
                  <visual><geometry><mesh filename="package://foo_pkg/meshes/base.dae"/></geometry></visual>
                </link>
                <gazebo><plugin name="cam" filename="libgazebo_ros_camera.so"/></gazebo>
              </robot>"#,
        );

        let refs: Vec<_> = desc.reference_attributes().collect();
        assert_eq!(
            refs,
            vec![
                "$(find foo_pkg)/urdf/base.xacro",
                "package://foo_pkg/meshes/base.dae",
                "libgazebo_ros_camera.so",
            ]
        );
    }

    #[test]
    fn root_attribute_is_not_a_reference() {
        let desc = parse(r#"<robot filename="package://x/self.urdf"><link/></robot>"#);
        assert_eq!(desc.reference_attributes().count(), 0);
    }

    #[test]
    fn include_uri_children() {
        let desc = parse(
            r#"<sdf version="1.6"><world name="w">
                <include><uri>model://maize_01</uri></include>
                <include><name>x</name><uri>model://ground</uri></include>
                <uri>model://not_in_include</uri>
              </world></sdf>"#,
        );
        let uris: Vec<_> = desc.find_children("include", "uri").filter_map(|e| e.text()).collect();
        assert_eq!(uris, vec!["model://maize_01", "model://ground"]);
    }

    #[test]
    fn text_presence_ignores_children_but_counts_whitespace() {
        let desc = parse(
            r#"<sdf><model>
                <materials></materials>
                <materials/>
                <materials>   </materials>
                <materials>some_script</materials>
                <materials><script/></materials>
                <materials>
                  <script/>
                </materials>
              </model></sdf>"#,
        );
        let with_text: Vec<bool> = desc.find_all("materials").map(Element::has_text).collect();
        assert_eq!(with_text, vec![false, false, true, true, false, true]);
    }

    #[test]
    fn local_names_ignore_prefixes() {
        let desc = parse(
            r#"<c:COLLADA xmlns:c="http://www.collada.org/2005/11/COLLADASchema">
                <c:image><c:init_from>tex.png</c:init_from></c:image>
              </c:COLLADA>"#,
        );
        assert_eq!(desc.find_all("init_from").count(), 0);
        let local: Vec<_> = desc.find_all_local("init_from").filter_map(|e| e.text()).collect();
        assert_eq!(local, vec!["tex.png"]);
    }

    #[test]
    fn entities_and_cdata_are_decoded() {
        let desc = parse(r#"<a><b x="1 &amp; 2">a &lt; b</b><c><![CDATA[raw <text>]]></c></a>"#);
        let b = desc.root().child("b").unwrap();
        assert_eq!(b.attr("x"), Some("1 & 2"));
        assert_eq!(b.text(), Some("a < b"));
        assert_eq!(desc.root().child("c").unwrap().text(), Some("raw <text>"));
    }

    #[test]
    fn malformed_markup_is_rejected() {
        for bad in ["<a><b></a>", "<a>", "", "just text", "<a/><b/>"] {
            let err = Descriptor::parse(Path::new("bad.world"), bad).unwrap_err();
            assert!(
                matches!(err, DescriptorError::Markup { .. }),
                "expected markup error for {bad:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn open_reports_missing_files() {
        let err = Descriptor::open(Path::new("/definitely/not/here.urdf")).unwrap_err();
        assert!(matches!(err, DescriptorError::Io { .. }));
    }

    #[test]
    fn descriptor_extension_detection() {
        assert!(is_descriptor(Path::new("a/robot.urdf")));
        assert!(is_descriptor(Path::new("a/robot.urdf.xacro")));
        assert!(is_descriptor(Path::new("a/field.WORLD")));
        assert!(is_descriptor(Path::new("model.sdf")));
        assert!(!is_descriptor(Path::new("meshes/wheel.dae")));
    }
}
