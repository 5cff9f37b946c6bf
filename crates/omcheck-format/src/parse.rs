//! OpenMetrics text exposition parser.
//!
//! Line-oriented: lines are separated by `\n`, a trailing `\r` is
//! stripped. Metadata lines (`# TYPE`, `# HELP`, `# UNIT`) open and
//! describe families; sample lines attach observations to a declared
//! family, directly or through the canonical kind suffixes; the literal
//! line `# EOF` terminates the payload and is required.

use std::collections::HashMap;

use crate::error::{ParseError, ParseResult};
use crate::types::{
    Label, LabelSet, MetricFamily, MetricKind, MetricSet, Sample, is_valid_name,
};

/// Parser behavior toggles.
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    /// Require `# TYPE` metadata for every sampled family. With this
    /// off, a sample for an undeclared name synthesizes an
    /// `unknown`-kind family instead of failing.
    pub require_type: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self { require_type: true }
    }
}

/// Parse a payload with default options.
pub fn parse(payload: &[u8]) -> ParseResult<MetricSet> {
    parse_with(payload, ParseOptions::default())
}

/// Parse a payload into a [`MetricSet`].
pub fn parse_with(payload: &[u8], options: ParseOptions) -> ParseResult<MetricSet> {
    Parser::new(options).parse(payload)
}

/// Suffixes a sample name may carry, longest-prefix-safe order.
const KNOWN_SUFFIXES: &[&str] = &[
    "_created", "_gcount", "_gsum", "_bucket", "_total", "_count", "_sum", "_info",
];

#[derive(Clone, Copy, PartialEq)]
enum Directive {
    Type,
    Help,
    Unit,
}

impl Directive {
    fn token(self) -> &'static str {
        match self {
            Self::Type => "TYPE",
            Self::Help => "HELP",
            Self::Unit => "UNIT",
        }
    }
}

/// Which metadata directives have been seen for a family.
#[derive(Default)]
struct MetaSeen {
    kind: bool,
    help: bool,
    unit: bool,
}

struct Parser {
    options: ParseOptions,
    families: Vec<MetricFamily>,
    meta: Vec<MetaSeen>,
    index: HashMap<String, usize>,
    /// Family currently being described or sampled, if any.
    current: Option<usize>,
    saw_eof: bool,
}

impl Parser {
    fn new(options: ParseOptions) -> Self {
        Self {
            options,
            families: Vec::new(),
            meta: Vec::new(),
            index: HashMap::new(),
            current: None,
            saw_eof: false,
        }
    }

    fn parse(mut self, payload: &[u8]) -> ParseResult<MetricSet> {
        let text = std::str::from_utf8(payload).map_err(|_| ParseError::InvalidUtf8)?;

        for (idx, raw) in text.split('\n').enumerate() {
            let line_no = idx + 1;
            let line = raw.strip_suffix('\r').unwrap_or(raw);

            if self.saw_eof {
                if !line.is_empty() {
                    return Err(ParseError::ContentAfterEof { line: line_no });
                }
                continue;
            }
            if line.is_empty() {
                continue;
            }

            if let Some(comment) = line.strip_prefix('#') {
                self.parse_comment(line_no, comment)?;
            } else {
                self.parse_sample(line_no, line)?;
            }
        }

        if !self.saw_eof {
            return Err(ParseError::Unterminated);
        }
        Ok(MetricSet {
            families: self.families,
        })
    }

    fn parse_comment(&mut self, line_no: usize, comment: &str) -> ParseResult<()> {
        if comment == " EOF" {
            self.saw_eof = true;
            return Ok(());
        }
        for directive in [Directive::Type, Directive::Help, Directive::Unit] {
            if let Some(rest) = comment.strip_prefix(&format!(" {} ", directive.token())) {
                return self.parse_metadata(line_no, directive, rest);
            }
        }
        // Any other comment line carries no meaning.
        Ok(())
    }

    fn parse_metadata(
        &mut self,
        line_no: usize,
        directive: Directive,
        rest: &str,
    ) -> ParseResult<()> {
        let (name, value) = match rest.split_once(' ') {
            Some((name, value)) => (name, value),
            // HELP text may be empty; TYPE and UNIT need a token.
            None if directive == Directive::Help => (rest, ""),
            None => {
                return Err(ParseError::MalformedMetadata {
                    line: line_no,
                    directive: directive.token(),
                });
            }
        };
        if !is_valid_name(name) {
            return Err(ParseError::InvalidName {
                line: line_no,
                name: name.to_string(),
            });
        }

        let idx = self.open_family(line_no, name)?;
        let seen = &mut self.meta[idx];
        let family = &mut self.families[idx];

        let duplicate = match directive {
            Directive::Type => seen.kind,
            Directive::Help => seen.help,
            Directive::Unit => seen.unit,
        };

        match directive {
            Directive::Type => {
                let kind = MetricKind::from_token(value).ok_or(ParseError::UnknownKind {
                    line: line_no,
                    token: value.to_string(),
                })?;
                if duplicate {
                    if family.kind != kind {
                        return Err(ParseError::FamilyKindConflict {
                            line: line_no,
                            family: family.name.clone(),
                            old: family.kind,
                            new: kind,
                        });
                    }
                    return Err(ParseError::DuplicateMetadata {
                        line: line_no,
                        directive: directive.token(),
                        family: family.name.clone(),
                    });
                }
                seen.kind = true;
                family.kind = kind;
            }
            Directive::Help => {
                if duplicate {
                    return Err(ParseError::DuplicateMetadata {
                        line: line_no,
                        directive: directive.token(),
                        family: family.name.clone(),
                    });
                }
                seen.help = true;
                family.help = Some(unescape_help(line_no, value)?);
            }
            Directive::Unit => {
                if duplicate {
                    return Err(ParseError::DuplicateMetadata {
                        line: line_no,
                        directive: directive.token(),
                        family: family.name.clone(),
                    });
                }
                if !family.name.ends_with(&format!("_{value}")) {
                    return Err(ParseError::UnitMismatch {
                        line: line_no,
                        unit: value.to_string(),
                        family: family.name.clone(),
                    });
                }
                seen.unit = true;
                family.unit = Some(value.to_string());
            }
        }
        Ok(())
    }

    /// Make `name` the family under description, creating it if new.
    ///
    /// Leaving a family that never produced a sample is the observable
    /// name-change error; returning to a family that already has samples
    /// is metadata-after-sample.
    fn open_family(&mut self, line_no: usize, name: &str) -> ParseResult<usize> {
        if let Some(cur) = self.current {
            if self.families[cur].name == name {
                return Ok(cur);
            }
            if self.families[cur].samples.is_empty() {
                return Err(ParseError::NameChanged {
                    from: self.families[cur].name.clone(),
                    to: name.to_string(),
                });
            }
        }
        if let Some(&idx) = self.index.get(name) {
            if !self.families[idx].samples.is_empty() {
                return Err(ParseError::MetadataAfterSample {
                    line: line_no,
                    family: name.to_string(),
                });
            }
            self.current = Some(idx);
            return Ok(idx);
        }
        let idx = self.push_family(name, MetricKind::Unknown);
        self.current = Some(idx);
        Ok(idx)
    }

    fn push_family(&mut self, name: &str, kind: MetricKind) -> usize {
        let idx = self.families.len();
        self.families.push(MetricFamily::new(name, kind));
        self.meta.push(MetaSeen::default());
        self.index.insert(name.to_string(), idx);
        idx
    }

    fn parse_sample(&mut self, line_no: usize, line: &str) -> ParseResult<()> {
        let bytes = line.as_bytes();
        let mut pos = 0;
        while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
            pos += 1;
        }
        let name = &line[..pos];
        if !is_valid_name(name) {
            return Err(ParseError::MalformedSample { line: line_no });
        }

        let labels = if bytes.get(pos) == Some(&b'{') {
            let (labels, consumed) = parse_labels(line_no, &line[pos + 1..])?;
            pos += 1 + consumed;
            LabelSet::new(labels).map_err(|dup| ParseError::DuplicateLabel {
                line: line_no,
                name: dup,
            })?
        } else {
            LabelSet::default()
        };

        let mut tokens = line[pos..].split_ascii_whitespace();
        let value_token = tokens
            .next()
            .ok_or(ParseError::MalformedSample { line: line_no })?;
        let timestamp_token = tokens.next();
        if tokens.next().is_some() {
            return Err(ParseError::MalformedSample { line: line_no });
        }

        let value = parse_value(line_no, value_token)?;
        let timestamp = timestamp_token
            .map(|t| parse_timestamp(line_no, t))
            .transpose()?;

        let family_idx = self.resolve_family(line_no, name)?;
        self.current = Some(family_idx);
        self.families[family_idx].samples.push(Sample {
            metric_name: name.to_string(),
            labels,
            value,
            timestamp,
        });
        Ok(())
    }

    /// Resolve a sample name to its owning family, directly or through
    /// the canonical kind suffixes.
    fn resolve_family(&mut self, line_no: usize, name: &str) -> ParseResult<usize> {
        if let Some(&idx) = self.index.get(name) {
            let family = &self.families[idx];
            if !family.kind.allows_bare_sample() {
                return Err(ParseError::BadSuffix {
                    line: line_no,
                    metric: name.to_string(),
                    kind: family.kind,
                    family: family.name.clone(),
                });
            }
            return Ok(idx);
        }
        for suffix in KNOWN_SUFFIXES {
            let Some(base) = name.strip_suffix(suffix) else {
                continue;
            };
            let Some(&idx) = self.index.get(base) else {
                continue;
            };
            let family = &self.families[idx];
            if !family.kind.allowed_suffixes().contains(suffix) {
                return Err(ParseError::BadSuffix {
                    line: line_no,
                    metric: name.to_string(),
                    kind: family.kind,
                    family: family.name.clone(),
                });
            }
            return Ok(idx);
        }
        // No declared family owns this name. If the family under
        // description is still empty, the producer changed names without
        // closing it.
        if let Some(cur) = self.current {
            if self.families[cur].samples.is_empty() {
                return Err(ParseError::NameChanged {
                    from: self.families[cur].name.clone(),
                    to: strip_known_suffix(name).to_string(),
                });
            }
        }
        if self.options.require_type {
            return Err(ParseError::UnknownFamily {
                line: line_no,
                metric: name.to_string(),
            });
        }
        Ok(self.push_family(name, MetricKind::Unknown))
    }
}

fn strip_known_suffix(name: &str) -> &str {
    for suffix in KNOWN_SUFFIXES {
        if let Some(base) = name.strip_suffix(suffix) {
            if !base.is_empty() {
                return base;
            }
        }
    }
    name
}

/// Parse a `{...}` label block. `input` starts after the opening brace;
/// returns the labels and the bytes consumed including the closing brace.
fn parse_labels(line_no: usize, input: &str) -> ParseResult<(Vec<Label>, usize)> {
    let bytes = input.as_bytes();
    let mut labels = Vec::new();
    let mut pos = 0;

    if bytes.first() == Some(&b'}') {
        return Ok((labels, 1));
    }
    loop {
        let start = pos;
        while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
            pos += 1;
        }
        let name = &input[start..pos];
        if !is_valid_name(name) {
            return Err(ParseError::InvalidLabelName {
                line: line_no,
                name: name.to_string(),
            });
        }
        if bytes.get(pos) != Some(&b'=') {
            return Err(ParseError::MalformedLabels { line: line_no });
        }
        pos += 1;
        if bytes.get(pos) != Some(&b'"') {
            return Err(ParseError::MalformedLabels { line: line_no });
        }
        pos += 1;

        let mut value = Vec::new();
        loop {
            match bytes.get(pos) {
                None => return Err(ParseError::UnterminatedString { line: line_no }),
                Some(b'"') => {
                    pos += 1;
                    break;
                }
                Some(b'\\') => {
                    pos += 1;
                    match bytes.get(pos) {
                        Some(b'\\') => value.push(b'\\'),
                        Some(b'"') => value.push(b'"'),
                        Some(b'n') => value.push(b'\n'),
                        Some(&other) => {
                            return Err(ParseError::BadEscape {
                                line: line_no,
                                escape: other as char,
                            });
                        }
                        None => return Err(ParseError::UnterminatedString { line: line_no }),
                    }
                    pos += 1;
                }
                Some(&b) => {
                    value.push(b);
                    pos += 1;
                }
            }
        }
        let value = String::from_utf8(value)
            .map_err(|_| ParseError::Internal("label value split UTF-8 sequence".to_string()))?;
        labels.push(Label::new(name, value));

        match bytes.get(pos) {
            Some(b',') => pos += 1,
            Some(b'}') => return Ok((labels, pos + 1)),
            _ => return Err(ParseError::MalformedLabels { line: line_no }),
        }
    }
}

/// HELP text allows the `\\` and `\n` escapes.
fn unescape_help(line_no: usize, text: &str) -> ParseResult<String> {
    if !text.contains('\\') {
        return Ok(text.to_string());
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some(other) => {
                return Err(ParseError::BadEscape {
                    line: line_no,
                    escape: other,
                });
            }
            None => {
                return Err(ParseError::BadEscape {
                    line: line_no,
                    escape: '\\',
                });
            }
        }
    }
    Ok(out)
}

/// Parse a sample value: an IEEE-754 double or one of the literal
/// tokens `+Inf`, `-Inf`, `NaN`.
fn parse_value(line_no: usize, token: &str) -> ParseResult<f64> {
    match token {
        "+Inf" => Ok(f64::INFINITY),
        "-Inf" => Ok(f64::NEG_INFINITY),
        "NaN" => Ok(f64::NAN),
        _ => parse_plain_number(token).ok_or_else(|| ParseError::MalformedNumber {
            line: line_no,
            token: token.to_string(),
        }),
    }
}

/// Parse a timestamp token: a plain double, no special tokens.
fn parse_timestamp(line_no: usize, token: &str) -> ParseResult<f64> {
    parse_plain_number(token).ok_or_else(|| ParseError::MalformedTimestamp {
        line: line_no,
        token: token.to_string(),
    })
}

fn parse_plain_number(token: &str) -> Option<f64> {
    if token.is_empty()
        || !token
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'+' | b'-' | b'.' | b'e' | b'E'))
    {
        return None;
    }
    token.parse().ok()
}
