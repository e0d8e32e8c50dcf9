//! Human-readable and XML serialization of [`ImageSpec`].
//!
//! Two renditions are supported:
//!
//! - **Text** - a terse, human-oriented summary ("640 x 480, 3 channel,
//!   u8" plus optional detail lines). One-way; meant for logs and CLI
//!   `--info` output.
//! - **XML** - a lossless rendition that [`ImageSpec::from_xml`] parses
//!   back, used to embed a full spec in sidecar files and texture headers.
//!
//! XML parsing goes through `quick-xml`; writing is plain `write!`
//! formatting since the document shape is fixed.
//!
//! # Example
//!
//! ```rust
//! use openimg_core::{DataFormat, ImageSpec, SpecFormat, SpecVerbosity};
//!
//! let mut spec = ImageSpec::from_dimensions(640, 480, 3, DataFormat::U8);
//! spec.attribute("Software", "openimg");
//!
//! let brief = spec.serialize(SpecFormat::Text, SpecVerbosity::Brief);
//! assert_eq!(brief, "640 x 480, 3 channel, u8");
//!
//! let round = ImageSpec::from_xml(&spec.to_xml()).unwrap();
//! assert_eq!(round, spec);
//! ```

use std::fmt::Write as _;

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::attr::{AttrValue, ParamValue};
use crate::error::{Error, Result};
use crate::format::DataFormat;
use crate::spec::ImageSpec;

/// Output syntax for [`ImageSpec::serialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecFormat {
    /// Human-readable text summary.
    Text,
    /// Lossless XML, parseable by [`ImageSpec::from_xml`].
    Xml,
}

/// Level of detail for the text rendition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecVerbosity {
    /// One line: resolution, channel count, format.
    Brief,
    /// The brief line plus geometry details, channel list, and all
    /// metadata attributes.
    Detailed,
}

impl ImageSpec {
    /// Renders this spec in the requested syntax.
    ///
    /// XML output is always complete; `verbosity` applies to text only.
    pub fn serialize(&self, format: SpecFormat, verbosity: SpecVerbosity) -> String {
        match format {
            SpecFormat::Xml => self.to_xml(),
            SpecFormat::Text => self.serialize_text(verbosity),
        }
    }

    fn serialize_text(&self, verbosity: SpecVerbosity) -> String {
        let mut out = String::new();
        if self.depth > 1 {
            let _ = write!(out, "{} x {} x {}", self.width, self.height, self.depth);
        } else {
            let _ = write!(out, "{} x {}", self.width, self.height);
        }
        let _ = write!(out, ", {} channel, ", self.nchannels);
        if self.channelformats.is_empty() {
            let _ = write!(out, "{}", self.format);
        } else {
            let names: Vec<&str> = self.channelformats.iter().map(|f| f.name()).collect();
            let _ = write!(out, "{}", names.join("/"));
        }
        if self.deep {
            out.push_str(" (deep)");
        }
        if verbosity == SpecVerbosity::Brief {
            return out;
        }

        if self.x != 0 || self.y != 0 || self.z != 0 {
            let _ = write!(out, "\n    pixel data origin: x={}, y={}", self.x, self.y);
            if self.depth > 1 {
                let _ = write!(out, ", z={}", self.z);
            }
        }
        if self.full_x != self.x
            || self.full_y != self.y
            || self.full_width != self.width
            || self.full_height != self.height
        {
            let _ = write!(
                out,
                "\n    full/display size: {} x {}\n    full/display origin: {}, {}",
                self.full_width, self.full_height, self.full_x, self.full_y
            );
        }
        if self.tile_width > 0 {
            let _ = write!(out, "\n    tile size: {} x {}", self.tile_width, self.tile_height);
            if self.tile_depth > 1 {
                let _ = write!(out, " x {}", self.tile_depth);
            }
        }
        if !self.channelnames.is_empty() {
            out.push_str("\n    channel list: ");
            for (i, name) in self.channelnames.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(name);
                if !self.channelformats.is_empty() {
                    let _ = write!(out, " ({})", self.channelformat(i as i32));
                }
            }
        }
        for attrib in &self.extra_attribs {
            match &attrib.value {
                AttrValue::Str(s) => {
                    let _ = write!(out, "\n    {}: \"{}\"", attrib.name, s);
                }
                v => {
                    let _ = write!(out, "\n    {}: {}", attrib.name, v);
                }
            }
        }
        out
    }

    /// Renders this spec as a self-contained XML element.
    ///
    /// The inverse of [`from_xml`](Self::from_xml): every field and every
    /// attribute survives the round trip.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        out.push_str("<ImageSpec version=\"10\">\n");
        let ints = [
            ("x", self.x),
            ("y", self.y),
            ("z", self.z),
            ("width", self.width),
            ("height", self.height),
            ("depth", self.depth),
            ("full_x", self.full_x),
            ("full_y", self.full_y),
            ("full_z", self.full_z),
            ("full_width", self.full_width),
            ("full_height", self.full_height),
            ("full_depth", self.full_depth),
            ("tile_width", self.tile_width),
            ("tile_height", self.tile_height),
            ("tile_depth", self.tile_depth),
            ("nchannels", self.nchannels),
            ("alpha_channel", self.alpha_channel),
            ("z_channel", self.z_channel),
            ("deep", self.deep as i32),
        ];
        for (tag, value) in ints {
            let _ = writeln!(out, " <{tag}>{value}</{tag}>");
        }
        let _ = writeln!(out, " <format>{}</format>", self.format);
        if !self.channelformats.is_empty() {
            let names: Vec<&str> = self.channelformats.iter().map(|f| f.name()).collect();
            let _ = writeln!(out, " <channelformats>{}</channelformats>", names.join(" "));
        }
        if !self.channelnames.is_empty() {
            out.push_str(" <channelnames>\n");
            for name in &self.channelnames {
                let _ = writeln!(out, "  <channelname>{}</channelname>", xml_escape(name));
            }
            out.push_str(" </channelnames>\n");
        }
        for attrib in &self.extra_attribs {
            let type_name = match &attrib.value {
                AttrValue::Int(_) => "int",
                AttrValue::Float(_) => "float",
                AttrValue::Double(_) => "double",
                AttrValue::Str(_) => "string",
                AttrValue::IntList(_) => "int[]",
                AttrValue::FloatList(_) => "float[]",
            };
            let _ = writeln!(
                out,
                " <attrib name=\"{}\" type=\"{}\">{}</attrib>",
                xml_escape(&attrib.name),
                type_name,
                xml_escape(&attrib.value.to_string())
            );
        }
        out.push_str("</ImageSpec>\n");
        out
    }

    /// Parses a spec from XML produced by [`to_xml`](Self::to_xml).
    ///
    /// Unrecognized elements are ignored so that newer writers remain
    /// readable; malformed numbers and missing structure are hard errors.
    pub fn from_xml(xml: &str) -> Result<ImageSpec> {
        let mut reader = Reader::from_reader(xml.as_bytes());

        let mut spec = ImageSpec::new(DataFormat::Unknown);
        let mut saw_root = false;
        let mut buf = Vec::new();
        let mut text = String::new();
        // (name, type) of the <attrib> element being read, if any.
        let mut cur_attrib: Option<(String, String)> = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    match name.as_str() {
                        "ImageSpec" => saw_root = true,
                        "attrib" => {
                            let aname = get_attr(&e, b"name")
                                .ok_or_else(|| Error::parse("attrib element without name"))?;
                            let atype = get_attr(&e, b"type")
                                .ok_or_else(|| Error::parse("attrib element without type"))?;
                            cur_attrib = Some((aname, atype));
                        }
                        _ => {}
                    }
                    text.clear();
                }
                Ok(Event::End(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    match name.as_str() {
                        "x" => spec.x = parse_i32(&text, &name)?,
                        "y" => spec.y = parse_i32(&text, &name)?,
                        "z" => spec.z = parse_i32(&text, &name)?,
                        "width" => spec.width = parse_i32(&text, &name)?,
                        "height" => spec.height = parse_i32(&text, &name)?,
                        "depth" => spec.depth = parse_i32(&text, &name)?,
                        "full_x" => spec.full_x = parse_i32(&text, &name)?,
                        "full_y" => spec.full_y = parse_i32(&text, &name)?,
                        "full_z" => spec.full_z = parse_i32(&text, &name)?,
                        "full_width" => spec.full_width = parse_i32(&text, &name)?,
                        "full_height" => spec.full_height = parse_i32(&text, &name)?,
                        "full_depth" => spec.full_depth = parse_i32(&text, &name)?,
                        "tile_width" => spec.tile_width = parse_i32(&text, &name)?,
                        "tile_height" => spec.tile_height = parse_i32(&text, &name)?,
                        "tile_depth" => spec.tile_depth = parse_i32(&text, &name)?,
                        "nchannels" => spec.nchannels = parse_i32(&text, &name)?,
                        "alpha_channel" => spec.alpha_channel = parse_i32(&text, &name)?,
                        "z_channel" => spec.z_channel = parse_i32(&text, &name)?,
                        "deep" => spec.deep = parse_i32(&text, &name)? != 0,
                        "format" => {
                            spec.format = DataFormat::from_name(text.trim())
                                .ok_or_else(|| Error::parse(format!("unknown format '{}'", text.trim())))?;
                        }
                        "channelformats" => {
                            spec.channelformats = text
                                .split_whitespace()
                                .map(|t| {
                                    DataFormat::from_name(t).ok_or_else(|| {
                                        Error::parse(format!("unknown channel format '{t}'"))
                                    })
                                })
                                .collect::<Result<_>>()?;
                        }
                        "channelname" => spec.channelnames.push(text.clone()),
                        "attrib" => {
                            if let Some((aname, atype)) = cur_attrib.take() {
                                let value = parse_attrib_value(&atype, &text)?;
                                spec.extra_attribs.push(ParamValue { name: aname, value });
                            }
                        }
                        _ => {}
                    }
                    text.clear();
                }
                Ok(Event::Text(e)) => {
                    text.push_str(&e.decode().unwrap_or_default());
                }
                Ok(Event::GeneralRef(e)) => {
                    text.push_str(&resolve_reference(&e)?);
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(Error::parse(format!("XML error: {e}"))),
                _ => {}
            }
            buf.clear();
        }

        if !saw_root {
            return Err(Error::parse("missing ImageSpec element"));
        }
        Ok(spec)
    }
}

/// Resolves a `&name;` / `&#NN;` reference event to its character.
fn resolve_reference(e: &quick_xml::events::BytesRef) -> Result<String> {
    if let Ok(Some(c)) = e.resolve_char_ref() {
        return Ok(c.to_string());
    }
    let name = e.decode().unwrap_or_default();
    match name.as_ref() {
        "amp" => Ok("&".to_string()),
        "lt" => Ok("<".to_string()),
        "gt" => Ok(">".to_string()),
        "quot" => Ok("\"".to_string()),
        "apos" => Ok("'".to_string()),
        other => Err(Error::parse(format!("unknown entity reference '&{other};'"))),
    }
}

fn parse_i32(text: &str, tag: &str) -> Result<i32> {
    text.trim()
        .parse()
        .map_err(|_| Error::parse(format!("bad integer '{}' in <{}>", text.trim(), tag)))
}

fn parse_attrib_value(type_name: &str, text: &str) -> Result<AttrValue> {
    let bad = || Error::parse(format!("bad {type_name} attrib value '{text}'"));
    match type_name {
        "int" => Ok(AttrValue::Int(text.trim().parse().map_err(|_| bad())?)),
        "float" => Ok(AttrValue::Float(text.trim().parse().map_err(|_| bad())?)),
        "double" => Ok(AttrValue::Double(text.trim().parse().map_err(|_| bad())?)),
        "string" => Ok(AttrValue::Str(text.to_string())),
        "int[]" => {
            let items: std::result::Result<Vec<i32>, _> =
                text.split(',').map(|t| t.trim().parse()).collect();
            Ok(AttrValue::IntList(items.map_err(|_| bad())?))
        }
        "float[]" => {
            let items: std::result::Result<Vec<f32>, _> =
                text.split(',').map(|t| t.trim().parse()).collect();
            Ok(AttrValue::FloatList(items.map_err(|_| bad())?))
        }
        _ => Err(Error::parse(format!("unknown attrib type '{type_name}'"))),
    }
}

fn get_attr(e: &quick_xml::events::BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).to_string())
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brief_text() {
        let spec = ImageSpec::from_dimensions(640, 480, 3, DataFormat::U8);
        assert_eq!(
            spec.serialize(SpecFormat::Text, SpecVerbosity::Brief),
            "640 x 480, 3 channel, u8"
        );
    }

    #[test]
    fn test_detailed_text() {
        let mut spec = ImageSpec::from_dimensions(640, 480, 4, DataFormat::F16);
        spec.tile_width = 64;
        spec.tile_height = 64;
        spec.tile_depth = 1;
        spec.attribute("Software", "openimg");
        spec.attribute("FrameRate", 24);
        let text = spec.serialize(SpecFormat::Text, SpecVerbosity::Detailed);
        assert!(text.starts_with("640 x 480, 4 channel, f16"));
        assert!(text.contains("tile size: 64 x 64"));
        assert!(text.contains("channel list: R, G, B, A"));
        assert!(text.contains("Software: \"openimg\""));
        assert!(text.contains("FrameRate: 24"));
    }

    #[test]
    fn test_xml_round_trip() {
        let mut spec = ImageSpec::from_dimensions(320, 240, 4, DataFormat::F16);
        spec.x = 16;
        spec.y = -8;
        spec.tile_width = 32;
        spec.tile_height = 32;
        spec.tile_depth = 1;
        spec.channelformats = vec![
            DataFormat::F16,
            DataFormat::F16,
            DataFormat::F16,
            DataFormat::U8,
        ];
        spec.deep = false;
        spec.attribute("Software", "openimg");
        spec.attribute("dpx:BitsPerSample", 10);
        spec.attribute("gain", 1.5f32);
        spec.attribute("chromaticities", vec![0.64f32, 0.33, 0.3, 0.6]);
        spec.attribute("window", vec![0, 0, 319, 239]);

        let xml = spec.to_xml();
        let parsed = ImageSpec::from_xml(&xml).unwrap();
        assert_eq!(parsed, spec);
    }

    #[test]
    fn test_xml_escaping_round_trip() {
        let mut spec = ImageSpec::from_dimensions(8, 8, 1, DataFormat::U8);
        spec.attribute("Description", "a <b> & \"c\"");
        let parsed = ImageSpec::from_xml(&spec.to_xml()).unwrap();
        assert_eq!(
            parsed.get_string_attribute("Description", ""),
            "a <b> & \"c\""
        );
    }

    #[test]
    fn test_from_xml_resolves_entity_references() {
        let spec = ImageSpec::from_xml(
            "<ImageSpec><width>4</width><height>2</height><nchannels>1</nchannels>\
             <attrib name=\"Description\" type=\"string\">a &lt;tag&gt; &amp; &#x41;</attrib>\
             </ImageSpec>",
        )
        .unwrap();
        assert_eq!(spec.get_string_attribute("Description", ""), "a <tag> & A");

        let err = ImageSpec::from_xml(
            "<ImageSpec><attrib name=\"x\" type=\"string\">&bogus;</attrib></ImageSpec>",
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_from_xml_rejects_garbage() {
        assert!(ImageSpec::from_xml("<sidecar/>").is_err());
        assert!(ImageSpec::from_xml("<ImageSpec><width>ten</width></ImageSpec>").is_err());
        assert!(ImageSpec::from_xml("not xml at <<< all").is_err());
    }

    #[test]
    fn test_from_xml_ignores_unknown_elements() {
        let xml = "<ImageSpec version=\"10\">\
                   <width>4</width><height>2</height><nchannels>1</nchannels>\
                   <format>u8</format><futurefield>7</futurefield></ImageSpec>";
        let spec = ImageSpec::from_xml(xml).unwrap();
        assert_eq!(spec.width, 4);
        assert_eq!(spec.height, 2);
        assert_eq!(spec.format, DataFormat::U8);
    }
}
