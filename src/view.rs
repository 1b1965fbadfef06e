use chrono::{Days, NaiveDate};
use serde::de::value::StrDeserializer;
use serde::de::IntoDeserializer;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ReportError, Result};
use crate::types::{DateBounds, PlotKind, PriceRow, PriceTable};

/// The three user-controlled inputs of a render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ViewParams {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub kind: PlotKind,
}

impl ViewParams {
    /// Widget defaults: the whole table, line plot.
    pub fn initial(bounds: DateBounds) -> Self {
        Self {
            start: bounds.min,
            end: bounds.max,
            kind: PlotKind::Line,
        }
    }

    pub fn validate(&self, bounds: DateBounds) -> Result<()> {
        for (field, date) in [("start", self.start), ("end", self.end)] {
            if !bounds.contains(date) {
                return Err(ReportError::OutOfRange {
                    field,
                    date,
                    min: bounds.min,
                    max: bounds.max,
                });
            }
        }
        Ok(())
    }

    /// Rows in `[start, end]`; empty when `start > end`.
    pub fn select<'a>(&self, table: &'a PriceTable) -> &'a [PriceRow] {
        table.slice(self.start, self.end)
    }
}

/// Partial parameters as sent by a client; unset or blank fields fall back
/// to defaults.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ViewQuery {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub start: Option<NaiveDate>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub end: Option<NaiveDate>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub kind: Option<PlotKind>,
}

// A cleared form input submits `field=`.
fn blank_as_none<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => {
            let de: StrDeserializer<'_, D::Error> = value.into_deserializer();
            T::deserialize(de).map(Some)
        }
    }
}

impl ViewQuery {
    pub fn resolve(&self, bounds: DateBounds) -> ViewParams {
        let initial = ViewParams::initial(bounds);
        ViewParams {
            start: self.start.unwrap_or(initial.start),
            end: self.end.unwrap_or(initial.end),
            kind: self.kind.unwrap_or(initial.kind),
        }
    }
}

/// Which widget the keyboard currently drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Start,
    End,
    Kind,
}

impl Field {
    pub fn next(self) -> Self {
        match self {
            Field::Start => Field::End,
            Field::End => Field::Kind,
            Field::Kind => Field::Start,
        }
    }
}

/// Bounded date pickers plus the plot-kind select. Every edit stays inside the
/// table's date range, so params produced here always validate.
#[derive(Debug, Clone, Copy)]
pub struct Widgets {
    pub bounds: DateBounds,
    pub params: ViewParams,
    pub focus: Field,
}

impl Widgets {
    pub fn new(bounds: DateBounds, params: ViewParams) -> Self {
        Self {
            bounds,
            params: ViewParams {
                start: bounds.clamp(params.start),
                end: bounds.clamp(params.end),
                kind: params.kind,
            },
            focus: Field::Start,
        }
    }

    /// Move the focused date by `days`, or toggle the plot kind.
    pub fn adjust(&mut self, days: i64) {
        match self.focus {
            Field::Start => self.params.start = shift(self.bounds, self.params.start, days),
            Field::End => self.params.end = shift(self.bounds, self.params.end, days),
            Field::Kind => self.params.kind = self.params.kind.toggle(),
        }
    }

    /// Re-clamp after the table was reloaded with a different range.
    pub fn rebound(&mut self, bounds: DateBounds) {
        *self = Self {
            focus: self.focus,
            ..Self::new(bounds, self.params)
        };
    }
}

fn shift(bounds: DateBounds, date: NaiveDate, days: i64) -> NaiveDate {
    let moved = if days >= 0 {
        date.checked_add_days(Days::new(days.unsigned_abs()))
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    };
    bounds.clamp(moved.unwrap_or(date))
}
