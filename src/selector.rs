//! Per-dimension slice selectors.
//!
//! A selector either fixes one position of an axis ([`Sel::Index`], which drops
//! the axis from the result) or picks a strided range of it ([`Sel::Range`]).
//! Ranges follow the usual half-open convention: the stop bound is exclusive and
//! negative bounds count from the end of the axis.

use std::ops::{Range, RangeFrom, RangeFull, RangeTo};
use std::str::FromStr;

use crate::{BartError, Result};

/// Selector for one dimension of a slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sel {
    /// A single position; the dimension is dropped from the result.
    Index(isize),
    /// A strided range with optional bounds (`None` means "from the edge").
    Range {
        start: Option<isize>,
        stop: Option<isize>,
        step: isize,
    },
}

impl Sel {
    /// Select a single position.
    pub const fn at(index: isize) -> Self {
        Sel::Index(index)
    }

    /// Select the whole axis.
    pub const fn full() -> Self {
        Sel::Range {
            start: None,
            stop: None,
            step: 1,
        }
    }

    /// Select `start..stop` with step 1.
    pub const fn range(start: isize, stop: isize) -> Self {
        Sel::Range {
            start: Some(start),
            stop: Some(stop),
            step: 1,
        }
    }

    /// Select a strided range.
    pub const fn stepped(start: Option<isize>, stop: Option<isize>, step: isize) -> Self {
        Sel::Range { start, stop, step }
    }

    /// Resolve the selector against an axis of the given extent.
    pub(crate) fn normalize(&self, axis: usize, extent: usize) -> Result<AxisRange> {
        let out_of_bounds = |value: isize| BartError::SliceBounds {
            axis,
            extent,
            value,
        };
        let signed_extent = extent as isize;
        match *self {
            Sel::Index(index) => {
                let resolved = if index < 0 {
                    index + signed_extent
                } else {
                    index
                };
                if resolved < 0 || resolved >= signed_extent {
                    return Err(out_of_bounds(index));
                }
                Ok(AxisRange {
                    start: resolved as usize,
                    step: 1,
                    len: 1,
                    scalar: true,
                })
            }
            Sel::Range { step: 0, .. } => {
                Err(BartError::InvalidSlice("slice step cannot be zero".into()))
            }
            Sel::Range { start, stop, step } => {
                let resolve = |bound: isize| -> Result<isize> {
                    let resolved = if bound < 0 {
                        bound + signed_extent
                    } else {
                        bound
                    };
                    if resolved < 0 || resolved > signed_extent {
                        return Err(out_of_bounds(bound));
                    }
                    Ok(resolved)
                };
                let (first, len) = if step > 0 {
                    let first = start.map(resolve).transpose()?.unwrap_or(0);
                    let last = stop.map(resolve).transpose()?.unwrap_or(signed_extent);
                    let len = if last > first {
                        (last - first + step - 1) / step
                    } else {
                        0
                    };
                    (first, len)
                } else {
                    // Descending ranges start at the last element by default and may
                    // run through index 0 when no stop is given.
                    let first = match start {
                        Some(bound) => {
                            let resolved = resolve(bound)?;
                            if resolved == signed_extent {
                                return Err(out_of_bounds(bound));
                            }
                            resolved
                        }
                        None => signed_extent - 1,
                    };
                    let last = match stop {
                        Some(bound) => resolve(bound)?,
                        None => -1,
                    };
                    let magnitude = -step;
                    let len = if first > last {
                        (first - last + magnitude - 1) / magnitude
                    } else {
                        0
                    };
                    (first, len)
                };
                Ok(AxisRange {
                    start: if len == 0 { 0 } else { first as usize },
                    step,
                    len: len as usize,
                    scalar: false,
                })
            }
        }
    }
}

impl From<isize> for Sel {
    fn from(index: isize) -> Self {
        Sel::Index(index)
    }
}

impl From<RangeFull> for Sel {
    fn from(_: RangeFull) -> Self {
        Sel::full()
    }
}

impl From<Range<isize>> for Sel {
    fn from(r: Range<isize>) -> Self {
        Sel::range(r.start, r.end)
    }
}

impl From<RangeFrom<isize>> for Sel {
    fn from(r: RangeFrom<isize>) -> Self {
        Sel::stepped(Some(r.start), None, 1)
    }
}

impl From<RangeTo<isize>> for Sel {
    fn from(r: RangeTo<isize>) -> Self {
        Sel::stepped(None, Some(r.end), 1)
    }
}

impl FromStr for Sel {
    type Err = BartError;

    /// Parse `"i"`, `":"`, `"a:b"` or `"a:b:c"`; empty parts take their defaults.
    fn from_str(expr: &str) -> Result<Self> {
        let invalid = || BartError::InvalidSlice(expr.to_string());
        let parse_bound = |part: &str| -> Result<Option<isize>> {
            let part = part.trim();
            if part.is_empty() {
                Ok(None)
            } else {
                part.parse::<isize>().map(Some).map_err(|_| invalid())
            }
        };

        let parts: Vec<&str> = expr.split(':').collect();
        match parts.as_slice() {
            [single] => parse_bound(single)?.map(Sel::Index).ok_or_else(invalid),
            [start, stop] => Ok(Sel::stepped(parse_bound(start)?, parse_bound(stop)?, 1)),
            [start, stop, step] => {
                let step = parse_bound(step)?.unwrap_or(1);
                if step == 0 {
                    return Err(invalid());
                }
                Ok(Sel::stepped(parse_bound(start)?, parse_bound(stop)?, step))
            }
            _ => Err(invalid()),
        }
    }
}

/// Parse one selector expression per dimension.
///
/// # Example
///
/// ```rust
/// use bart_ndarray::{parse_selectors, Sel};
///
/// let sels = parse_selectors(&["1", "1:4", ":"]).unwrap();
/// assert_eq!(sels, vec![Sel::at(1), Sel::range(1, 4), Sel::full()]);
/// ```
pub fn parse_selectors(exprs: &[&str]) -> Result<Vec<Sel>> {
    exprs.iter().map(|e| e.parse()).collect()
}

/// A selector resolved against a concrete axis extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AxisRange {
    pub start: usize,
    pub step: isize,
    pub len: usize,
    /// The axis is fixed at `start` and does not appear in the view.
    pub scalar: bool,
}

impl AxisRange {
    /// Parent position of the `i`-th element of the range.
    #[inline]
    pub fn at(&self, i: usize) -> usize {
        (self.start as isize + i as isize * self.step) as usize
    }

    /// True when the range covers the whole axis in order.
    pub fn is_full(&self, extent: usize) -> bool {
        !self.scalar && self.start == 0 && self.step == 1 && self.len == extent
    }
}
