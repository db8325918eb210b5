//! Data series: a scale bound to one attribute of a shape collection.
//!
//! A series never owns shapes. It writes through a [`SeriesTarget`], which
//! resolves keys to shapes and tolerates keys that no longer exist.

use std::collections::BTreeMap;

use crate::config::{NormalizeKind, ScaleParams, SeriesParams};
use crate::errors::ScaleError;
use crate::scale::{ColorScale, Normalize, NumericScale, OrdinalScale, Scale, Tick};
use crate::types::AttrValue;

/// The shape collection a series writes to
pub trait SeriesTarget {
    /// Override `attribute` of the shape under `key` with `value`.
    fn apply_series_value(&mut self, key: &str, attribute: &str, value: AttrValue);

    /// Return `attribute` of the shape under `key` to its initial style.
    fn restore_series_value(&mut self, key: &str, attribute: &str);
}

impl From<NormalizeKind> for Normalize {
    fn from(kind: NormalizeKind) -> Self {
        match kind {
            NormalizeKind::Linear => Normalize::Linear,
            NormalizeKind::Polynomial => Normalize::Polynomial,
        }
    }
}

/// Build the scale for `attribute` from its configured entries.
///
/// Stops become a color scale on `fill`/`stroke` and a numeric scale on
/// any other attribute; a table becomes an ordinal scale; no entries give
/// a pass-through scale.
pub fn build_scale(
    attribute: &str,
    params: Option<&ScaleParams>,
    normalize: Normalize,
) -> Result<Scale, ScaleError> {
    let scale = match params {
        None => Scale::Simple,
        Some(ScaleParams::Table(table)) => Scale::Ordinal(OrdinalScale::new(
            table.iter().map(|(k, v)| (k.clone(), v.clone())),
        )),
        Some(ScaleParams::Stops(stops)) if matches!(attribute, "fill" | "stroke") => {
            let colors = stops
                .iter()
                .map(|stop| match stop {
                    AttrValue::Text(color) => Ok(color.as_str()),
                    AttrValue::Number(_) => Err(ScaleError::InvalidColor {
                        value: stop.to_string(),
                    }),
                })
                .collect::<Result<Vec<_>, _>>()?;
            let mut scale = ColorScale::new(colors)?;
            scale.numeric_mut().set_normalize(normalize);
            Scale::Color(scale)
        }
        Some(ScaleParams::Stops(stops)) => {
            let stops = stops
                .iter()
                .map(|stop| {
                    stop.as_f64().ok_or_else(|| ScaleError::InvalidStop {
                        value: stop.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Scale::Numeric(NumericScale::new(stops).with_normalize(normalize))
        }
    };
    Ok(scale)
}

#[derive(Clone, Debug)]
pub struct DataSeries {
    attribute: String,
    scale: Scale,
    /// Every value set so far, by key
    values: BTreeMap<String, AttrValue>,
}

impl DataSeries {
    /// Series from parameters. Configured values are not applied; pass
    /// them to [`DataSeries::set_values`] once the target exists.
    pub fn new(params: &SeriesParams) -> Result<Self, ScaleError> {
        let mut scale = build_scale(
            &params.attribute,
            params.scale.as_ref(),
            params.normalize_function.into(),
        )?;
        if let Some(numeric) = scale.numeric_mut() {
            if let Some(min) = params.min {
                numeric.set_min(min);
            }
            if let Some(max) = params.max {
                numeric.set_max(max);
            }
        }
        Ok(Self::with_scale(params.attribute.clone(), scale))
    }

    pub fn with_scale(attribute: impl Into<String>, scale: Scale) -> Self {
        Self {
            attribute: attribute.into(),
            scale,
            values: BTreeMap::new(),
        }
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn scale(&self) -> &Scale {
        &self.scale
    }

    pub fn values(&self) -> &BTreeMap<String, AttrValue> {
        &self.values
    }

    /// Apply `values` to their shapes. Keys not mentioned keep whatever
    /// they show now.
    ///
    /// Numeric scales without configured bounds take them from the first
    /// value set and keep them afterwards.
    pub fn set_values(
        &mut self,
        values: BTreeMap<String, AttrValue>,
        target: &mut dyn SeriesTarget,
    ) {
        if let Some(numeric) = self.scale.numeric_mut() {
            let numbers = values
                .values()
                .filter_map(AttrValue::as_f64)
                .filter(|n| !n.is_nan());
            let (min, max) = numbers.fold((None::<f64>, None::<f64>), |(lo, hi), n| {
                (
                    Some(lo.map_or(n, |lo| lo.min(n))),
                    Some(hi.map_or(n, |hi| hi.max(n))),
                )
            });
            if let (None, Some(min)) = (numeric.min(), min) {
                numeric.set_min(min);
            }
            if let (None, Some(max)) = (numeric.max(), max) {
                numeric.set_max(max);
            }
        }

        for (key, value) in &values {
            match self.scale.value(value) {
                Some(resolved) => target.apply_series_value(key, &self.attribute, resolved),
                None => target.restore_series_value(key, &self.attribute),
            }
        }
        self.values.extend(values);
    }

    /// Restore every shape this series touched and forget its values.
    pub fn clear(&mut self, target: &mut dyn SeriesTarget) {
        for key in std::mem::take(&mut self.values).keys() {
            target.restore_series_value(key, &self.attribute);
        }
    }

    /// Replace the scale entries and re-apply the stored values. Numeric
    /// bounds and normalization carry over.
    pub fn set_scale(
        &mut self,
        params: &ScaleParams,
        target: &mut dyn SeriesTarget,
    ) -> Result<(), ScaleError> {
        let previous = self.scale.numeric().cloned();
        let normalize = previous
            .as_ref()
            .map(|numeric| numeric.normalize().clone())
            .unwrap_or_default();
        let mut scale = build_scale(&self.attribute, Some(params), normalize)?;
        if let (Some(previous), Some(numeric)) = (previous, scale.numeric_mut()) {
            if let Some(min) = previous.min() {
                numeric.set_min(min);
            }
            if let Some(max) = previous.max() {
                numeric.set_max(max);
            }
        }
        self.scale = scale;
        self.reapply(target);
        Ok(())
    }

    /// Change the normalization of a numeric scale and re-apply the stored
    /// values. Other scales ignore it.
    pub fn set_normalize_function(&mut self, normalize: Normalize, target: &mut dyn SeriesTarget) {
        if let Some(numeric) = self.scale.numeric_mut() {
            numeric.set_normalize(normalize);
        }
        self.reapply(target);
    }

    /// Legend entries of the scale
    pub fn ticks(&self) -> Vec<Tick> {
        self.scale.ticks()
    }

    fn reapply(&mut self, target: &mut dyn SeriesTarget) {
        let values = self.values.clone();
        self.set_values(values, target);
    }
}
