//! DICOM data dumping library
//!
//! This is a helper library
//! for printing the element tree of a DICOM file
//! in a human readable way.
//!
//! # Examples
//!
//! ```no_run
//! use dcmtree_object::open_file;
//! use dcmtree_dump::dump_file;
//!
//! let obj = open_file("path/to/file.dcm")?;
//! dump_file(&obj)?;
//! # Result::<(), Box<dyn std::error::Error>>::Ok(())
//! ```
//!
//! See the [`DumpOptions`] builder for additional dumping options.
//!
//! ```no_run
//! use dcmtree_object::open_file;
//! use dcmtree_dump::DumpOptions;
//!
//! let obj = open_file("path/to/file2.dcm")?;
//! let mut options = DumpOptions::new();
//! // dump to stdout (width = 100)
//! options.width(100).dump_file(&obj)?;
//! # Result::<(), Box<dyn std::error::Error>>::Ok(())
//! ```
use dcmtree_core::{ElementRef, ElementTree, VR};
use dcmtree_object::FileDicomObject;
use owo_colors::*;
use std::borrow::Cow;
use std::fmt::{self, Display, Formatter};
use std::io::{stdout, Result as IoResult, Write};
use std::str::FromStr;

/// Options and flags to configure how to dump a DICOM file or element tree.
///
/// # Example
///
/// ```no_run
/// use dcmtree_object::open_file;
/// use dcmtree_dump::{ColorMode, DumpOptions};
///
/// let my_dicom_file = open_file("/path_to_file")?;
/// let mut options = DumpOptions::new();
/// options
///     // maximum 120 characters per line
///     .width(120)
///     // never print colored output
///     .color_mode(ColorMode::Never)
///     // dump to stdout
///     .dump_file(&my_dicom_file)?;
/// # Result::<(), Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Debug, Default, Clone, PartialEq)]
#[non_exhaustive]
pub struct DumpOptions {
    /// whether to produce colored output
    pub color: ColorMode,
    /// the console width to assume when trimming long values
    pub width: Option<u32>,
    /// never trim out any values
    pub no_limit: bool,
}

impl DumpOptions {
    pub fn new() -> Self {
        Default::default()
    }

    /// Set the maximum output width in number of characters.
    pub fn width(&mut self, width: u32) -> &mut Self {
        self.width = Some(width);
        self
    }

    /// Set the maximum output width to automatic,
    /// based on terminal size.
    ///
    /// This is the default behavior.
    /// If a terminal width could not be determined,
    /// the default width of 120 characters is used.
    pub fn width_auto(&mut self) -> &mut Self {
        self.width = None;
        self
    }

    /// Set whether to remove the maximum width restriction.
    pub fn no_limit(&mut self, no_limit: bool) -> &mut Self {
        self.no_limit = no_limit;
        self
    }

    /// Set the output color mode.
    pub fn color_mode(&mut self, color: ColorMode) -> &mut Self {
        self.color = color;
        self
    }

    /// Dump the contents of an open DICOM file to standard output.
    pub fn dump_file(&self, obj: &FileDicomObject) -> IoResult<()> {
        self.dump_file_impl(stdout().lock(), obj, true)
    }

    /// Dump the contents of an open DICOM file to the given writer.
    pub fn dump_file_to(&self, to: impl Write, obj: &FileDicomObject) -> IoResult<()> {
        self.dump_file_impl(to, obj, false)
    }

    fn dump_file_impl(
        &self,
        mut to: impl Write,
        obj: &FileDicomObject,
        to_stdout: bool,
    ) -> IoResult<()> {
        self.set_color_override(to_stdout);

        writeln!(to, "Transfer Syntax: {}", obj.transfer_syntax())?;
        match (obj.sop_class_uid(), obj.sop_class_name()) {
            (Some(uid), Some(name)) => writeln!(to, "SOP Class: {} ({})", uid, name)?,
            (Some(uid), None) => writeln!(to, "SOP Class: {}", uid)?,
            (None, _) => {}
        }
        writeln!(to, "{:-<58}", "")?;

        let width = self.effective_width(to_stdout);
        for element in obj.roots() {
            dump_element(&mut to, element, width)?;
        }
        Ok(())
    }

    /// Dump every element of a tree to the given writer.
    pub fn dump_tree_to(&self, mut to: impl Write, tree: &ElementTree) -> IoResult<()> {
        self.set_color_override(false);
        let width = self.effective_width(false);
        for element in tree.roots() {
            dump_element(&mut to, element, width)?;
        }
        Ok(())
    }

    /// Dump a single element, and its contents if it is a sequence,
    /// to standard output.
    pub fn dump_element(&self, element: ElementRef<'_>) -> IoResult<()> {
        self.set_color_override(true);
        dump_element(&mut stdout().lock(), element, self.effective_width(true))
    }

    /// Dump a single element, and its contents if it is a sequence,
    /// to the given writer.
    pub fn dump_element_to(&self, mut to: impl Write, element: ElementRef<'_>) -> IoResult<()> {
        self.set_color_override(false);
        dump_element(&mut to, element, self.effective_width(false))
    }

    fn set_color_override(&self, to_stdout: bool) {
        match (self.color, to_stdout) {
            (ColorMode::Never, _) => owo_colors::set_override(false),
            (ColorMode::Always, _) => owo_colors::set_override(true),
            (ColorMode::Auto, false) => owo_colors::set_override(false),
            (ColorMode::Auto, true) => owo_colors::unset_override(),
        }
    }

    /// The maximum line width, or `None` for no limit.
    fn effective_width(&self, to_stdout: bool) -> Option<u32> {
        if self.no_limit {
            return None;
        }
        match (self.width, to_stdout) {
            (Some(width), _) => Some(width),
            (None, true) => Some(determine_width(None)),
            // no terminal to fit into
            (None, false) => None,
        }
    }
}

/// Enumeration of output coloring modes.
#[derive(Debug, Default, Copy, Clone, Eq, Hash, PartialEq)]
pub enum ColorMode {
    /// Produce colored output if supported by the destination
    /// (namely, if the destination is a terminal).
    /// When dumping to an arbitrary writer,
    /// the output will not be colored.
    ///
    /// This is the default behavior.
    #[default]
    Auto,
    /// Never produce colored output.
    Never,
    /// Always produce colored output.
    Always,
}

impl std::fmt::Display for ColorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColorMode::Never => f.write_str("never"),
            ColorMode::Auto => f.write_str("auto"),
            ColorMode::Always => f.write_str("always"),
        }
    }
}

impl FromStr for ColorMode {
    type Err = ColorModeError;
    fn from_str(color: &str) -> Result<Self, Self::Err> {
        match color {
            "never" => Ok(ColorMode::Never),
            "auto" => Ok(ColorMode::Auto),
            "always" => Ok(ColorMode::Always),
            _ => Err(ColorModeError),
        }
    }
}

/// The error raised when providing an invalid color mode.
#[derive(Debug, Default, Copy, Clone, Eq, Hash, PartialEq)]
pub struct ColorModeError;

impl Display for ColorModeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("invalid color mode")
    }
}

impl std::error::Error for ColorModeError {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DumpValue<T>
where
    T: ToString,
{
    TagNum(T),
    Num(T),
    Str(T),
    DateTime(T),
    Nothing(T),
}

impl<T> fmt::Display for DumpValue<T>
where
    T: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DumpValue::TagNum(v) => {
                write!(f, "{}", v.if_supports_color(Stream::Stdout, |v| v.dimmed()))
            }
            DumpValue::Num(v) => write!(f, "{}", v.if_supports_color(Stream::Stdout, |v| v.cyan())),
            DumpValue::Str(v) => {
                write!(f, "{}", v.if_supports_color(Stream::Stdout, |v| v.yellow()))
            }
            DumpValue::DateTime(v) => {
                write!(f, "{}", v.if_supports_color(Stream::Stdout, |v| v.green()))
            }
            DumpValue::Nothing(v) => {
                write!(f, "{}", v.if_supports_color(Stream::Stdout, |v| v.italic()))
            }
        }
    }
}

/// Dump the contents of a DICOM file to stdout.
pub fn dump_file(obj: &FileDicomObject) -> IoResult<()> {
    DumpOptions::new().dump_file(obj)
}

/// Dump the contents of a DICOM file to the given writer.
pub fn dump_file_to(to: impl Write, obj: &FileDicomObject) -> IoResult<()> {
    DumpOptions::new().dump_file_to(to, obj)
}

/// Print one element per line, indented by nesting level,
/// followed by the items and elements it contains.
fn dump_element<W>(to: &mut W, element: ElementRef<'_>, width: Option<u32>) -> IoResult<()>
where
    W: ?Sized + Write,
{
    let indent = "  ".repeat(indent_level(element));
    if element.is_item() {
        writeln!(to, "{}{} item", indent, DumpValue::TagNum("(FFFE,E000)"))?;
    } else if element.is_sequence() {
        let items = element.children().count();
        writeln!(
            to,
            "{}{} SQ {} ({} item{})",
            indent,
            DumpValue::TagNum(element.tag()),
            element.length(),
            items,
            if items == 1 { "" } else { "s" },
        )?;
    } else {
        // tag, VR and length come first
        let prefix_len = indent.len() + 11 + 1 + 2 + 1 + element.length().to_string().len() + 1;
        let max_characters = width.map(|w| w.saturating_sub(prefix_len as u32 + 2));
        writeln!(
            to,
            "{}{} {} {} '{}'",
            indent,
            DumpValue::TagNum(element.tag()),
            element.vr(),
            element.length(),
            value_summary(element, max_characters),
        )?;
    }

    for child in element.children() {
        dump_element(to, child, width)?;
    }
    Ok(())
}

/// Items are printed one level deeper than their sequence,
/// and elements one level deeper than their item.
fn indent_level(element: ElementRef<'_>) -> usize {
    let mut level = 0;
    let mut cursor = element.parent();
    while let Some(parent) = cursor {
        level += 1;
        cursor = parent.parent();
    }
    level
}

fn value_summary(element: ElementRef<'_>, max_characters: Option<u32>) -> DumpValue<String> {
    let text = element.to_string_lossy();
    let text = match max_characters {
        Some(max) => cut_str(&text, max).into_owned(),
        None => text,
    };
    if element.value().is_none() || element.length().0 == 0 {
        return DumpValue::Nothing(text);
    }
    match element.vr() {
        VR::DA | VR::TM | VR::DT => DumpValue::DateTime(text),
        VR::FL | VR::FD | VR::UL | VR::US | VR::SL | VR::SS | VR::SV | VR::UV | VR::IS | VR::DS => {
            DumpValue::Num(text)
        }
        VR::AT => DumpValue::TagNum(text),
        _ => DumpValue::Str(text),
    }
}

fn cut_str(s: &str, max_characters: u32) -> Cow<str> {
    let max = (max_characters.saturating_sub(3)) as usize;
    let len = s.chars().count();

    if len > max {
        s.chars()
            .take(max)
            .chain("...".chars())
            .collect::<String>()
            .into()
    } else {
        s.into()
    }
}

fn determine_width(user_width: Option<u32>) -> u32 {
    user_width
        .or_else(|| terminal_size::terminal_size().map(|(width, _)| width.0 as u32))
        .unwrap_or(120)
}

#[cfg(test)]
mod tests {
    use super::cut_str;
    use crate::{ColorMode, DumpOptions};
    use dcmtree_core::{ElementTree, Tag, VR};
    use dcmtree_object::FileDicomObject;

    fn sample() -> FileDicomObject {
        let mut obj = FileDicomObject::new_empty();
        obj.append_element(None, Tag::SOP_CLASS_UID, VR::UI, "1.2.840.10008.5.1.4.1.1.2")
            .unwrap();
        obj.append_element(None, Tag(0x0008, 0x0060), VR::CS, "CT")
            .unwrap();
        let seq = obj.append_sequence(None, Tag(0x0008, 0x1115)).unwrap();
        let item = obj.append_item(seq).unwrap();
        obj.append_element(Some(item), Tag(0x0010, 0x0010), VR::PN, "DOE^JOHN")
            .unwrap();
        obj.append_element(None, Tag(0x0028, 0x0010), VR::US, 512_u16.to_le_bytes())
            .unwrap();
        obj.append_element(None, Tag(0x0008, 0x0023), VR::DA, "")
            .unwrap();
        obj
    }

    fn lines_of(out: &[u8]) -> Vec<String> {
        std::str::from_utf8(out)
            .expect("output is not valid UTF-8")
            .lines()
            .map(String::from)
            .collect()
    }

    #[test]
    fn dump_file_to_covers_properties() {
        let mut out = Vec::new();
        DumpOptions::new()
            .color_mode(ColorMode::Never)
            .dump_file_to(&mut out, &sample())
            .unwrap();

        let lines = lines_of(&out);
        assert_eq!(
            lines[0],
            "Transfer Syntax: explicit VR little endian (1.2.840.10008.1.2.1)"
        );
        assert_eq!(lines[1], "SOP Class: 1.2.840.10008.5.1.4.1.1.2 (CT Image Storage)");
        assert_eq!(
            lines[2],
            "----------------------------------------------------------"
        );
        assert_eq!(lines[3], "(0002,0010) UI 20 '1.2.840.10008.1.2.1'");
        assert_eq!(lines[4], "(0008,0016) UI 26 '1.2.840.10008.5.1.4.1.1.2'");
        assert_eq!(lines[5], "(0008,0060) CS 2 'CT'");
        assert_eq!(lines[6], "(0008,1115) SQ U/L (1 item)");
        assert_eq!(lines[7], "  (FFFE,E000) item");
        assert_eq!(lines[8], "    (0010,0010) PN 8 'DOE^JOHN'");
        assert_eq!(lines[9], "(0028,0010) US 2 '512'");
        assert_eq!(lines[10], "(0008,0023) DA 0 'empty'");
        assert_eq!(lines.len(), 11);
    }

    #[test]
    fn cut_long_values() {
        let mut tree = ElementTree::new();
        tree.append_element(None, Tag(0x0020, 0x4000), VR::LT, "x".repeat(200))
            .unwrap();

        let mut out = Vec::new();
        DumpOptions::new()
            .width(40)
            .color_mode(ColorMode::Never)
            .dump_tree_to(&mut out, &tree)
            .unwrap();
        let lines = lines_of(&out);
        assert!(lines[0].len() <= 40, "line too long: {}", lines[0]);
        assert!(lines[0].ends_with("...'"));

        let mut out = Vec::new();
        DumpOptions::new()
            .width(40)
            .no_limit(true)
            .color_mode(ColorMode::Never)
            .dump_tree_to(&mut out, &tree)
            .unwrap();
        assert!(lines_of(&out)[0].contains(&"x".repeat(200)));
    }

    #[test]
    fn dump_single_element() {
        let obj = sample();
        let element = obj.find_tag(Tag(0x0010, 0x0010)).unwrap();
        let mut out = Vec::new();
        DumpOptions::new()
            .color_mode(ColorMode::Never)
            .dump_element_to(&mut out, element)
            .unwrap();
        assert_eq!(lines_of(&out), vec!["    (0010,0010) PN 8 'DOE^JOHN'"]);
    }

    #[test]
    fn cut_str_adds_ellipsis() {
        assert_eq!(cut_str("abcdefgh", 6), "abc...");
        assert_eq!(cut_str("abc", 6), "abc");
    }
}
