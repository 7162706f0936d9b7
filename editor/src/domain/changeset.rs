//! OSM XML changeset serialization.
//!
//! Output targets manual upload through standard OSM editors: every element
//! is marked `action="modify"` with a placeholder `version="1"`, because the
//! working set never learns real element versions.

use std::fmt::Write as _;

use super::element::{OsmElement, Tags};
use super::working_set::ChangeView;

/// File name offered for the exported changeset.
pub const EXPORT_FILE_NAME: &str = "gtfs-changes.osm";

/// Default `generator` attribute.
pub const DEFAULT_GENERATOR: &str = "osm-gtfs";

/// Serializes change views into an OSM 0.6 document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangesetWriter {
    generator: String,
}

impl Default for ChangesetWriter {
    fn default() -> Self {
        Self::new(DEFAULT_GENERATOR)
    }
}

impl ChangesetWriter {
    /// Writer stamping documents with `generator`.
    pub fn new(generator: impl Into<String>) -> Self {
        Self {
            generator: generator.into(),
        }
    }

    /// Generator attribute value.
    pub fn generator(&self) -> &str {
        &self.generator
    }

    /// Render `changes` in order, using each element's current state.
    ///
    /// # Examples
    /// ```
    /// use osm_gtfs_editor::domain::{ChangesetWriter, LonLat, Tags, WorkingSet};
    ///
    /// let mut working_set = WorkingSet::new();
    /// working_set.create_new_node(
    ///     LonLat::new(10.0, 45.0),
    ///     Tags::from([("name".to_owned(), "A & B".to_owned())]),
    /// )?;
    /// let xml = working_set.export_changeset(&ChangesetWriter::default());
    /// assert!(xml.contains(r#"<tag k="name" v="A &amp; B"/>"#));
    /// # Ok::<(), osm_gtfs_editor::domain::Error>(())
    /// ```
    pub fn write(&self, changes: &[ChangeView<'_>]) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        let _ = writeln!(
            out,
            "<osm version=\"0.6\" generator=\"{}\">",
            escape_xml(&self.generator)
        );
        for change in changes {
            write_element(&mut out, change.element);
        }
        out.push_str("</osm>\n");
        out
    }
}

fn write_element(out: &mut String, element: &OsmElement) {
    match element {
        OsmElement::Node(node) => {
            let _ = writeln!(
                out,
                "  <node id=\"{}\" lat=\"{}\" lon=\"{}\" action=\"modify\" version=\"1\">",
                node.id, node.lat, node.lon
            );
            write_tags(out, &node.tags);
            out.push_str("  </node>\n");
        }
        OsmElement::Way(way) => {
            let _ = writeln!(
                out,
                "  <way id=\"{}\" action=\"modify\" version=\"1\">",
                way.id
            );
            for reference in &way.nodes {
                let _ = writeln!(out, "    <nd ref=\"{reference}\"/>");
            }
            write_tags(out, &way.tags);
            out.push_str("  </way>\n");
        }
        OsmElement::Relation(relation) => {
            let _ = writeln!(
                out,
                "  <relation id=\"{}\" action=\"modify\" version=\"1\">",
                relation.id
            );
            for member in &relation.members {
                let _ = writeln!(
                    out,
                    "    <member type=\"{}\" ref=\"{}\" role=\"{}\"/>",
                    member.member_type,
                    member.reference,
                    escape_xml(&member.role)
                );
            }
            write_tags(out, &relation.tags);
            out.push_str("  </relation>\n");
        }
    }
}

fn write_tags(out: &mut String, tags: &Tags) {
    for (key, value) in tags {
        let _ = writeln!(
            out,
            "    <tag k=\"{}\" v=\"{}\"/>",
            escape_xml(key),
            escape_xml(value)
        );
    }
}

/// Escape text for an XML attribute value.
///
/// Markup characters become named entities. Tab, line feed, and carriage
/// return become character references so attribute normalization keeps
/// them. Characters XML 1.0 cannot carry are dropped.
pub fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            '\t' | '\n' | '\r' => {
                let _ = write!(escaped, "&#{};", u32::from(ch));
            }
            other if is_xml_char(other) => escaped.push(other),
            _ => {}
        }
    }
    escaped
}

fn is_xml_char(ch: char) -> bool {
    !matches!(
        ch,
        '\u{0}'..='\u{8}' | '\u{b}' | '\u{c}' | '\u{e}'..='\u{1f}' | '\u{fffe}' | '\u{ffff}'
    )
}

/// Inverse of [`escape_xml`]: named entities and decimal or hex character
/// references. Unknown entities are left as-is.
pub fn unescape_xml(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut rest = escaped;
    while let Some((before, after)) = rest.split_once('&') {
        out.push_str(before);
        match decode_entity(after) {
            Some((ch, tail)) => {
                out.push(ch);
                rest = tail;
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(input: &str) -> Option<(char, &str)> {
    let (name, tail) = input.split_once(';')?;
    let ch = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        _ => {
            let reference = name.strip_prefix('#')?;
            let code = match reference.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None if reference.bytes().all(|byte| byte.is_ascii_digit()) => {
                    reference.parse().ok()?
                }
                None => return None,
            };
            char::from_u32(code)?
        }
    };
    Some((ch, tail))
}

#[cfg(test)]
mod tests {
    //! Unit tests for changeset rendering and escaping.

    use super::*;
    use crate::domain::element::{ElementKey, ElementType, LonLat, Relation, RelationMember, Way};
    use crate::domain::working_set::WorkingSet;
    use rstest::rstest;

    #[rstest]
    #[case::markup("<b>&\"quoted\"</b>", "&lt;b&gt;&amp;&quot;quoted&quot;&lt;/b&gt;")]
    #[case::apostrophe("St John's", "St John&apos;s")]
    #[case::plain("Central", "Central")]
    fn escapes_special_characters(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(escape_xml(raw), expected);
        assert_eq!(unescape_xml(expected), raw);
    }

    #[test]
    fn unescape_leaves_unknown_entities() {
        assert_eq!(unescape_xml("a &nbsp; b & c"), "a &nbsp; b & c");
        assert_eq!(unescape_xml("&#xZZ; &#-1;"), "&#xZZ; &#-1;");
    }

    #[test]
    fn whitespace_is_kept_as_character_references() {
        let raw = "Platform 1\nNorthbound\tside\r";
        let escaped = escape_xml(raw);
        assert_eq!(escaped, "Platform 1&#10;Northbound&#9;side&#13;");
        assert_eq!(unescape_xml(&escaped), raw);
        assert_eq!(unescape_xml("&#x41;&#66;"), "AB");
    }

    #[test]
    fn characters_xml_cannot_carry_are_dropped() {
        assert_eq!(escape_xml("a\u{0}b\u{1b}c\u{fffe}d"), "abcd");
    }

    #[test]
    fn empty_change_list_is_a_bare_document() {
        let xml = ChangesetWriter::default().write(&[]);
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<osm version=\"0.6\" generator=\"osm-gtfs\">\n</osm>\n"
        );
    }

    #[test]
    fn ways_and_relations_render_references() {
        let mut working_set = WorkingSet::new();
        working_set.update_overpass_data([
            OsmElement::Way(Way {
                id: 7,
                nodes: vec![1, 2],
                tags: Tags::new(),
            }),
            OsmElement::Relation(Relation {
                id: 9,
                members: vec![RelationMember {
                    member_type: ElementType::Way,
                    reference: 7,
                    role: "platform".to_owned(),
                }],
                tags: Tags::new(),
            }),
        ]);
        for key in [ElementKey::way(7), ElementKey::relation(9)] {
            working_set
                .set_element_tags(key, Tags::from([("name".to_owned(), "X".to_owned())]))
                .expect("element loaded");
        }

        let xml = working_set.export_changeset(&ChangesetWriter::new("test-gen"));

        assert!(xml.contains("<osm version=\"0.6\" generator=\"test-gen\">"));
        assert!(xml.contains(
            "  <way id=\"7\" action=\"modify\" version=\"1\">\n    <nd ref=\"1\"/>\n    <nd ref=\"2\"/>\n    <tag k=\"name\" v=\"X\"/>\n  </way>\n"
        ));
        assert!(xml.contains("<member type=\"way\" ref=\"7\" role=\"platform\"/>"));
    }

    #[test]
    fn nodes_render_current_position_and_sorted_tags() {
        let mut working_set = WorkingSet::new();
        working_set
            .create_new_node(
                LonLat::new(-3.25, 55.5),
                Tags::from([
                    ("ref".to_owned(), "1".to_owned()),
                    ("name".to_owned(), "A".to_owned()),
                ]),
            )
            .expect("valid position");

        let xml = working_set.export_changeset(&ChangesetWriter::default());

        assert!(xml.contains(
            "  <node id=\"-1\" lat=\"55.5\" lon=\"-3.25\" action=\"modify\" version=\"1\">\n    <tag k=\"name\" v=\"A\"/>\n    <tag k=\"ref\" v=\"1\"/>\n  </node>\n"
        ));
    }
}
