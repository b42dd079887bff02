//! Fixed-binning histograms owned by selectors.
//!
//! Each selector gets a [`HistogramDir`] named after it. Histograms are booked
//! in `initialise`, filled per event and written out by the driver at the end
//! of the run as one [`HistogramFile`].

use crate::stream::file::FileHeader;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Index into `HistogramDir::hists`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct HistId(pub u32);

impl HistId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for HistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HistId({})", self.0)
    }
}

/// One-dimensional histogram with under- and overflow bins.
///
/// `contents[0]` is the underflow bin and `contents[bins + 1]` the overflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hist1D {
    pub name: String,
    pub title: String,
    pub bins: usize,
    pub low: f64,
    pub high: f64,
    contents: Vec<f64>,
    entries: u64,
    sum_w: f64,
    sum_wx: f64,
}

impl Hist1D {
    pub fn new(
        name: impl Into<String>,
        title: impl Into<String>,
        bins: usize,
        low: f64,
        high: f64,
    ) -> Self {
        let bins = bins.max(1);
        Self {
            name: name.into(),
            title: title.into(),
            bins,
            low,
            high,
            contents: vec![0.0; bins + 2],
            entries: 0,
            sum_w: 0.0,
            sum_wx: 0.0,
        }
    }

    /// Bin index for `x`, including under/overflow.
    pub fn find_bin(&self, x: f64) -> usize {
        if x.is_nan() || x < self.low {
            0
        } else if x >= self.high {
            self.bins + 1
        } else {
            let width = (self.high - self.low) / self.bins as f64;
            (((x - self.low) / width) as usize).min(self.bins - 1) + 1
        }
    }

    pub fn fill(&mut self, x: f64) {
        self.fill_weighted(x, 1.0);
    }

    pub fn fill_weighted(&mut self, x: f64, weight: f64) {
        let bin = self.find_bin(x);
        self.contents[bin] += weight;
        self.entries += 1;
        // Statistics only cover the in-range bins
        if bin != 0 && bin != self.bins + 1 {
            self.sum_w += weight;
            self.sum_wx += weight * x;
        }
    }

    pub fn bin_content(&self, bin: usize) -> f64 {
        self.contents.get(bin).copied().unwrap_or(0.0)
    }

    pub fn underflow(&self) -> f64 {
        self.contents[0]
    }

    pub fn overflow(&self) -> f64 {
        self.contents[self.bins + 1]
    }

    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Sum of in-range weights.
    pub fn integral(&self) -> f64 {
        self.contents[1..=self.bins].iter().sum()
    }

    pub fn mean(&self) -> f64 {
        if self.sum_w == 0.0 {
            0.0
        } else {
            self.sum_wx / self.sum_w
        }
    }
}

/// The histograms of one selector.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistogramDir {
    pub name: String,
    hists: Vec<Hist1D>,
}

impl HistogramDir {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hists: Vec::new(),
        }
    }

    /// Book a histogram. Booking an existing name returns the existing id.
    pub fn book(
        &mut self,
        name: &str,
        title: &str,
        bins: usize,
        low: f64,
        high: f64,
    ) -> HistId {
        if let Some(index) = self.hists.iter().position(|h| h.name == name) {
            return HistId(index as u32);
        }
        let id = HistId(self.hists.len() as u32);
        self.hists.push(Hist1D::new(name, title, bins, low, high));
        id
    }

    /// Fill histogram `id`. Unknown ids are ignored.
    pub fn fill(&mut self, id: HistId, x: f64) {
        if let Some(hist) = self.hists.get_mut(id.index()) {
            hist.fill(x);
        }
    }

    pub fn get(&self, id: HistId) -> Option<&Hist1D> {
        self.hists.get(id.index())
    }

    pub fn by_name(&self, name: &str) -> Option<&Hist1D> {
        self.hists.iter().find(|h| h.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Hist1D> {
        self.hists.iter()
    }

    pub fn len(&self) -> usize {
        self.hists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hists.is_empty()
    }
}

/// Histogram output of a whole run, one directory per selector.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistogramFile {
    #[serde(default)]
    pub header: FileHeader,
    pub directories: BTreeMap<String, HistogramDir>,
}

impl HistogramFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, dir: HistogramDir) {
        self.directories.insert(dir.name.clone(), dir);
    }

    pub fn dir(&self, name: &str) -> Option<&HistogramDir> {
        self.directories.get(name)
    }
}
