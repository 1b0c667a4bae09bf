//! Serde helpers keeping non-finite floats in JSON files.
//!
//! JSON numbers cannot hold NaN or infinities, which serde_json writes as `null`.
//! These values are written as the strings `"NaN"`, `"inf"` and `"-inf"` instead.
//! Use the submodules with `#[serde(with = "...")]`.
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A float written as a JSON number when finite, and as a string otherwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JsonFloat(pub f64);

impl Serialize for JsonFloat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let value = self.0;
        if value.is_finite() {
            serializer.serialize_f64(value)
        } else if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if value > 0.0 {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }
}

struct JsonFloatVisitor;

impl<'de> Visitor<'de> for JsonFloatVisitor {
    type Value = JsonFloat;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a number or one of \"NaN\", \"inf\" and \"-inf\"")
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<JsonFloat, E> {
        Ok(JsonFloat(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<JsonFloat, E> {
        Ok(JsonFloat(value as f64))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<JsonFloat, E> {
        Ok(JsonFloat(value as f64))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<JsonFloat, E> {
        match value {
            "NaN" => Ok(JsonFloat(f64::NAN)),
            "inf" => Ok(JsonFloat(f64::INFINITY)),
            "-inf" => Ok(JsonFloat(f64::NEG_INFINITY)),
            _ => Err(E::invalid_value(de::Unexpected::Str(value), &self)),
        }
    }

    // Plain serde_json writes non-finite floats as null.
    fn visit_unit<E: de::Error>(self) -> Result<JsonFloat, E> {
        Ok(JsonFloat(f64::NAN))
    }
}

impl<'de> Deserialize<'de> for JsonFloat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(JsonFloatVisitor)
    }
}

/// A sequence of floats.
pub mod series {
    use super::JsonFloat;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().copied().map(JsonFloat))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let values = Vec::<JsonFloat>::deserialize(deserializer)?;
        Ok(values.into_iter().map(|v| v.0).collect())
    }
}

/// A sequence of 3-D points.
pub mod points {
    use super::JsonFloat;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(points: &[[f64; 3]], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(points.iter().map(|p| p.map(JsonFloat)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<[f64; 3]>, D::Error> {
        let points = Vec::<[JsonFloat; 3]>::deserialize(deserializer)?;
        Ok(points.into_iter().map(|p| p.map(|v| v.0)).collect())
    }
}

/// A dynamically sized matrix, written as `[nrows, ncols, values]` with column-major values.
pub mod matrix {
    use super::JsonFloat;
    use nalgebra::DMatrix;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(matrix: &DMatrix<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        let values: Vec<JsonFloat> = matrix.iter().copied().map(JsonFloat).collect();
        (matrix.nrows(), matrix.ncols(), values).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DMatrix<f64>, D::Error> {
        let (nrows, ncols, values) = <(usize, usize, Vec<JsonFloat>)>::deserialize(deserializer)?;
        if nrows.checked_mul(ncols) != Some(values.len()) {
            return Err(D::Error::custom(format!(
                "{} values for a {} x {} matrix",
                values.len(),
                nrows,
                ncols
            )));
        }
        Ok(DMatrix::from_iterator(
            nrows,
            ncols,
            values.into_iter().map(|v| v.0),
        ))
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::DMatrix;
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    struct Record {
        #[serde(with = "series")]
        values: Vec<f64>,
        #[serde(with = "matrix")]
        matrix: DMatrix<f64>,
    }

    #[test]
    fn test_non_finite_values_survive() {
        let record = Record {
            values: vec![1.5, f64::NAN, f64::INFINITY, f64::NEG_INFINITY],
            matrix: DMatrix::from_row_slice(2, 2, &[0.1, f64::NAN, -3.0, f64::INFINITY]),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("null"));

        let loaded: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.values[0], 1.5);
        assert!(loaded.values[1].is_nan());
        assert_eq!(loaded.values[2], f64::INFINITY);
        assert_eq!(loaded.values[3], f64::NEG_INFINITY);
        assert_eq!(loaded.matrix.shape(), (2, 2));
        assert_eq!(loaded.matrix[(0, 0)], 0.1);
        assert!(loaded.matrix[(0, 1)].is_nan());
        assert_eq!(loaded.matrix[(1, 0)], -3.0);
        assert_eq!(loaded.matrix[(1, 1)], f64::INFINITY);
    }

    #[test]
    fn test_null_and_integers_accepted() {
        let loaded: Record =
            serde_json::from_str(r#"{"values": [null, 2], "matrix": [1, 2, [3, "-inf"]]}"#).unwrap();
        assert!(loaded.values[0].is_nan());
        assert_eq!(loaded.values[1], 2.0);
        assert_eq!(loaded.matrix[(0, 1)], f64::NEG_INFINITY);
    }

    #[test]
    fn test_matrix_size_checked() {
        let result: Result<Record, _> =
            serde_json::from_str(r#"{"values": [], "matrix": [2, 2, [1.0]]}"#);
        assert!(result.is_err());
        let result: Result<Record, _> = serde_json::from_str(r#"{"values": ["nan"], "matrix": [0, 0, []]}"#);
        assert!(result.is_err());
    }
}
