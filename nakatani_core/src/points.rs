//! Ordered list of measurement points.
//!
//! Points live in an arena; `next`/`prev` links are indices into it, so the
//! list can be walked in both directions without reference cycles. Order is
//! fixed once built; points are never removed.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::BuildError;

/// Index of a point inside its list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointId(usize);

impl PointId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One anatomical location to measure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasurementPoint {
    name: String,
    value: Option<u32>,
    next: Option<PointId>,
    prev: Option<PointId>,
}

impl MeasurementPoint {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved resistance, once the point has stabilized.
    pub fn value(&self) -> Option<u32> {
        self.value
    }

    pub fn next(&self) -> Option<PointId> {
        self.next
    }

    pub fn prev(&self) -> Option<PointId> {
        self.prev
    }
}

/// Anatomical object a session walks over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResearchObject {
    LeftHand,
    RightHand,
    LeftFoot,
    RightFoot,
}

/// Six-point grid measured on every object: two rows of three.
const SIX_POINT_GRID: [&str; 6] = [
    "Point 1-1",
    "Point 1-2",
    "Point 1-3",
    "Point 2-1",
    "Point 2-2",
    "Point 2-3",
];

impl ResearchObject {
    pub const ALL: [ResearchObject; 4] = [
        ResearchObject::LeftHand,
        ResearchObject::RightHand,
        ResearchObject::LeftFoot,
        ResearchObject::RightFoot,
    ];

    /// Point names in measuring order.
    pub fn point_names(self) -> &'static [&'static str] {
        match self {
            ResearchObject::LeftHand
            | ResearchObject::RightHand
            | ResearchObject::LeftFoot
            | ResearchObject::RightFoot => &SIX_POINT_GRID,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ResearchObject::LeftHand => "left-hand",
            ResearchObject::RightHand => "right-hand",
            ResearchObject::LeftFoot => "left-foot",
            ResearchObject::RightFoot => "right-foot",
        }
    }
}

impl fmt::Display for ResearchObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResearchObject {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|o| o.name() == wanted)
            .ok_or_else(|| format!("unknown research object {s:?}"))
    }
}

/// Doubly traversable, fixed-order sequence of points.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeasurementPointList {
    points: Vec<MeasurementPoint>,
    head: Option<PointId>,
    tail: Option<PointId>,
}

impl MeasurementPointList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Static topology for a research object.
    pub fn for_object(object: ResearchObject) -> Self {
        let mut list = Self::new();
        for name in object.point_names() {
            list.link_back((*name).to_string());
        }
        list
    }

    /// Build from explicit names, rejecting empty lists and duplicates.
    pub fn from_names<I, S>(names: I) -> Result<Self, BuildError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list = Self::new();
        for name in names {
            list.append(name)?;
        }
        if list.is_empty() {
            return Err(BuildError::EmptyPointList);
        }
        Ok(list)
    }

    /// Add a point after the current tail. Names are unique within a list.
    pub fn append(&mut self, name: impl Into<String>) -> Result<PointId, BuildError> {
        let name = self.unused(name.into())?;
        Ok(self.link_back(name))
    }

    /// Add a point before the current head. Names are unique within a list.
    pub fn prepend(&mut self, name: impl Into<String>) -> Result<PointId, BuildError> {
        let name = self.unused(name.into())?;
        Ok(self.link_front(name))
    }

    fn unused(&self, name: String) -> Result<String, BuildError> {
        if self.position(&name).is_some() {
            return Err(BuildError::DuplicatePointName(name));
        }
        Ok(name)
    }

    fn link_back(&mut self, name: String) -> PointId {
        let id = PointId(self.points.len());
        self.points.push(MeasurementPoint {
            name,
            value: None,
            next: None,
            prev: self.tail,
        });
        match self.tail {
            Some(tail) => self.points[tail.0].next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        id
    }

    fn link_front(&mut self, name: String) -> PointId {
        let id = PointId(self.points.len());
        self.points.push(MeasurementPoint {
            name,
            value: None,
            next: self.head,
            prev: None,
        });
        match self.head {
            Some(head) => self.points[head.0].prev = Some(id),
            None => self.tail = Some(id),
        }
        self.head = Some(id);
        id
    }

    pub fn head(&self) -> Option<PointId> {
        self.head
    }

    pub fn tail(&self) -> Option<PointId> {
        self.tail
    }

    pub fn head_point(&self) -> Option<&MeasurementPoint> {
        self.head.map(|id| &self.points[id.0])
    }

    pub fn get(&self, id: PointId) -> Option<&MeasurementPoint> {
        self.points.get(id.0)
    }

    pub fn next(&self, id: PointId) -> Option<PointId> {
        self.get(id).and_then(MeasurementPoint::next)
    }

    pub fn prev(&self, id: PointId) -> Option<PointId> {
        self.get(id).and_then(MeasurementPoint::prev)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Look a point up by name.
    pub fn position(&self, name: &str) -> Option<PointId> {
        self.iter().find(|(_, p)| p.name == name).map(|(id, _)| id)
    }

    /// Walk from head to tail.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    /// Every point in list order.
    pub fn all_points(&self) -> Vec<&MeasurementPoint> {
        self.iter().map(|(_, p)| p).collect()
    }

    /// Store the resolved value of a point. A point is resolved at most once.
    pub(crate) fn record(&mut self, id: PointId, value: u32) -> Result<(), String> {
        let point = self
            .points
            .get_mut(id.0)
            .ok_or_else(|| format!("no point with index {}", id.0))?;
        if let Some(existing) = point.value {
            return Err(format!(
                "point {} already holds {existing}",
                point.name
            ));
        }
        point.value = Some(value);
        Ok(())
    }

    pub(crate) fn clear_values(&mut self) {
        for point in &mut self.points {
            point.value = None;
        }
    }

    /// True once every point holds a value.
    pub fn is_complete(&self) -> bool {
        self.points.iter().all(|p| p.value.is_some())
    }

    /// `(name, value)` pairs in list order.
    pub fn results(&self) -> Vec<(String, Option<u32>)> {
        self.iter()
            .map(|(_, p)| (p.name.clone(), p.value))
            .collect()
    }

    /// Name → value for every resolved point.
    pub fn result_map(&self) -> HashMap<String, u32> {
        self.iter()
            .filter_map(|(_, p)| p.value.map(|v| (p.name.clone(), v)))
            .collect()
    }
}

/// Head-to-tail iterator following `next` links.
pub struct Iter<'a> {
    list: &'a MeasurementPointList,
    cursor: Option<PointId>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (PointId, &'a MeasurementPoint);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let point = self.list.points.get(id.0)?;
        self.cursor = point.next;
        Some((id, point))
    }
}

impl<'a> IntoIterator for &'a MeasurementPointList {
    type Item = (PointId, &'a MeasurementPoint);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
