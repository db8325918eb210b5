//! Tokenizer for path data (`d` attribute) shared by the VML translator and
//! the bounding-box computation.

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "render/path_data.pest"]
struct PathDataParser;

/// A numeric argument as written in the source
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathNumber {
    pub value: f64,
    /// Literal used exponential notation (`1e-5`)
    pub exponent: bool,
}

/// One command letter with the arguments that follow it
#[derive(Clone, Debug, PartialEq)]
pub struct PathSegment {
    pub command: char,
    pub args: Vec<PathNumber>,
}

impl PathSegment {
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.args.iter().map(|n| n.value)
    }
}

/// Split path data into command segments.
///
/// Numbers before the first command and stray characters are ignored.
pub fn parse_path_data(d: &str) -> Vec<PathSegment> {
    let Ok(pairs) = PathDataParser::parse(Rule::path_data, d) else {
        crate::log::warn!(len = d.len(), "unparseable path data");
        return Vec::new();
    };

    let mut segments = Vec::new();
    for pair in pairs {
        for inner in pair.into_inner() {
            if inner.as_rule() == Rule::segment {
                if let Some(segment) = parse_segment(inner) {
                    segments.push(segment);
                }
            }
        }
    }
    segments
}

fn parse_segment(pair: Pair<Rule>) -> Option<PathSegment> {
    let mut inner = pair.into_inner();
    let command = inner.next()?.as_str().chars().next()?;
    let args = inner
        .filter(|p| p.as_rule() == Rule::number)
        .filter_map(|p| parse_number(p.as_str()))
        .collect();
    Some(PathSegment { command, args })
}

fn parse_number(text: &str) -> Option<PathNumber> {
    let value = text.parse::<f64>().ok()?;
    Some(PathNumber {
        value,
        exponent: text.contains(['e', 'E']),
    })
}
