//! Property paths and their resolution against a combined configuration.
//!
//! A path is a `.`-separated list of child names. A leading `/` anchors it
//! at the tree root, anything else is resolved below the current node. A
//! leading `.` is accepted as an explicit marker for a relative path. A
//! segment may select one member of a repeated group with `name[n]`.

use super::combined::CombinedConfig;
use super::node::ConfigNode;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Marks a path as absolute.
pub const ROOT_MARKER: char = '/';

/// Separates path segments.
pub const SEPARATOR: char = '.';

/// Malformed path syntax.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path is empty")]
    Empty,
    #[error("path '{0}' contains an empty segment")]
    EmptySegment(String),
    #[error("segment '{0}' has a malformed index selector")]
    BadIndex(String),
}

/// One segment of a [`PropertyPath`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub name: String,
    pub index: Option<usize>,
}

impl Segment {
    fn parse(text: &str, path: &str) -> Result<Self, PathError> {
        if text.is_empty() {
            return Err(PathError::EmptySegment(path.to_string()));
        }
        let Some(open) = text.find('[') else {
            if text.contains(']') {
                return Err(PathError::BadIndex(text.to_string()));
            }
            return Ok(Self {
                name: text.to_string(),
                index: None,
            });
        };

        let name = &text[..open];
        let selector = text[open + 1..]
            .strip_suffix(']')
            .ok_or_else(|| PathError::BadIndex(text.to_string()))?;
        if name.is_empty() || !selector.chars().all(|c| c.is_ascii_digit()) {
            return Err(PathError::BadIndex(text.to_string()));
        }
        let index = selector
            .parse::<usize>()
            .map_err(|_| PathError::BadIndex(text.to_string()))?;
        Ok(Self {
            name: name.to_string(),
            index: Some(index),
        })
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}[{}]", self.name, index),
            None => f.write_str(&self.name),
        }
    }
}

/// A parsed property path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyPath {
    absolute: bool,
    segments: Vec<Segment>,
}

impl PropertyPath {
    pub fn parse(text: &str) -> Result<Self, PathError> {
        let (absolute, body) = match text.strip_prefix(ROOT_MARKER) {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix(SEPARATOR).unwrap_or(text)),
        };
        if body.is_empty() {
            return Err(PathError::Empty);
        }
        let segments = body
            .split(SEPARATOR)
            .map(|segment| Segment::parse(segment, text))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { absolute, segments })
    }

    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Whether any segment carries an index selector.
    pub fn has_index(&self) -> bool {
        self.segments.iter().any(|s| s.index.is_some())
    }
}

impl FromStr for PropertyPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.absolute {
            write!(f, "{}", ROOT_MARKER)?;
        }
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", SEPARATOR)?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

/// One concrete step of a [`Locator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub name: String,
    pub index: usize,
}

/// Address of a node in the combined configuration.
///
/// A locator is a list of exact steps from the root. A member of a repeated
/// group is pinned to the source holding the group, and relative lookups
/// below it only consult that source. A locator below a single node that
/// shadowed a lower source's group skips that source and everything under
/// it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Locator {
    steps: Vec<Step>,
    pinned: Option<usize>,
    floor: usize,
}

impl Locator {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn pinned_source(&self) -> Option<usize> {
        self.pinned
    }

    /// The same location, restricted to one source.
    pub fn pinned_to(mut self, source: usize) -> Self {
        self.pinned = Some(source);
        self
    }

    /// Indices of the sources consulted below this locator, highest first.
    fn consulted(&self, count: usize) -> Vec<usize> {
        match self.pinned {
            Some(index) if index < count => vec![index],
            Some(_) => Vec::new(),
            None => (self.floor..count).rev().collect(),
        }
    }

    /// Render `path` as seen from this locator.
    pub fn join(&self, path: &PropertyPath) -> String {
        if path.is_absolute() || self.is_root() {
            let rendered = path.to_string();
            return match rendered.strip_prefix(ROOT_MARKER) {
                Some(_) => rendered,
                None => format!("{}{}", ROOT_MARKER, rendered),
            };
        }
        format!("{}{}{}", self, SEPARATOR, path)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", ROOT_MARKER)?;
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", SEPARATOR)?;
            }
            write!(f, "{}[{}]", step.name, step.index)?;
        }
        Ok(())
    }
}

/// A node reached by a resolution.
#[derive(Debug, Clone)]
pub struct Match<'a> {
    pub locator: Locator,
    pub node: &'a ConfigNode,
}

/// Outcome of resolving a path.
#[derive(Debug, Clone)]
pub enum Resolution<'a> {
    NotFound,
    Found {
        /// Index of the winning source in the combined configuration.
        source: usize,
        matches: Vec<Match<'a>>,
    },
}

impl<'a> Resolution<'a> {
    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found { .. })
    }

    pub fn source(&self) -> Option<usize> {
        match self {
            Resolution::Found { source, .. } => Some(*source),
            Resolution::NotFound => None,
        }
    }

    pub fn first(&self) -> Option<&Match<'a>> {
        match self {
            Resolution::Found { matches, .. } => matches.first(),
            Resolution::NotFound => None,
        }
    }

    pub fn matches(&self) -> &[Match<'a>] {
        match self {
            Resolution::Found { matches, .. } => matches,
            Resolution::NotFound => &[],
        }
    }
}

/// Resolve `path` relative to `locator`.
///
/// Sources are walked together, highest priority first. A child name held
/// exactly once by every source that has it is shared, so the lookup below
/// it falls back per leaf. Otherwise the highest source holding that name
/// owns it: a repeated group there is expanded member by member within
/// that source only, and lower sources never contribute to the group.
pub fn resolve<'a>(
    path: &PropertyPath,
    locator: &Locator,
    config: &'a CombinedConfig,
) -> Resolution<'a> {
    let origin = if path.is_absolute() {
        Locator::root()
    } else {
        locator.clone()
    };

    let sources = config.sources();
    let layers: Vec<Layer<'a>> = origin
        .consulted(sources.len())
        .into_iter()
        .filter_map(|source| {
            walk_exact(sources[source].root(), origin.steps()).map(|node| Layer { source, node })
        })
        .collect();
    if layers.is_empty() {
        return Resolution::NotFound;
    }

    let mut frontier = vec![Position {
        locator: origin,
        layers,
    }];
    for segment in path.segments() {
        let mut next = Vec::new();
        for position in &frontier {
            position.descend(segment, &mut next);
        }
        if next.is_empty() {
            return Resolution::NotFound;
        }
        frontier = next;
    }

    let mut winner = None;
    let mut matches = Vec::new();
    for position in frontier {
        let Some(layer) = position.layers.iter().find(|l| l.node.is_defined()) else {
            continue;
        };
        winner.get_or_insert(layer.source);
        matches.push(Match {
            locator: position.locator,
            node: layer.node,
        });
    }
    match winner {
        Some(source) => Resolution::Found { source, matches },
        None => Resolution::NotFound,
    }
}

/// A node as seen in one source.
#[derive(Debug, Clone, Copy)]
struct Layer<'a> {
    source: usize,
    node: &'a ConfigNode,
}

/// One location reached by a walk, with every source that shares it.
#[derive(Debug)]
struct Position<'a> {
    locator: Locator,
    layers: Vec<Layer<'a>>,
}

impl<'a> Position<'a> {
    fn descend(&self, segment: &Segment, out: &mut Vec<Position<'a>>) {
        let mut shared: Vec<Layer<'a>> = Vec::new();
        let mut floor = self.locator.floor;
        for layer in &self.layers {
            let members: Vec<&'a ConfigNode> = layer.node.children_named(&segment.name).collect();
            match members.len() {
                0 => {}
                1 => shared.push(Layer {
                    source: layer.source,
                    node: members[0],
                }),
                _ if shared.is_empty() => {
                    for (index, node) in members.into_iter().enumerate() {
                        if segment.index.is_some_and(|wanted| wanted != index) {
                            continue;
                        }
                        let mut locator = self.step(segment, index);
                        locator.pinned = Some(layer.source);
                        out.push(Position {
                            locator,
                            layers: vec![Layer {
                                source: layer.source,
                                node,
                            }],
                        });
                    }
                    return;
                }
                _ => {
                    // A single node above shadows this group and all below it.
                    floor = layer.source + 1;
                    break;
                }
            }
        }
        if shared.is_empty() || segment.index.is_some_and(|wanted| wanted != 0) {
            return;
        }
        let mut locator = self.step(segment, 0);
        locator.floor = floor;
        out.push(Position {
            locator,
            layers: shared,
        });
    }

    fn step(&self, segment: &Segment, index: usize) -> Locator {
        let mut locator = self.locator.clone();
        locator.steps.push(Step {
            name: segment.name.clone(),
            index,
        });
        locator
    }
}

fn walk_exact<'a>(root: &'a ConfigNode, steps: &[Step]) -> Option<&'a ConfigNode> {
    steps
        .iter()
        .try_fold(root, |node, step| node.child(&step.name, step.index))
}
