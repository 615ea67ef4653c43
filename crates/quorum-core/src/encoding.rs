//! Fixed-width boundary encodings
//!
//! Scalars cross the boundary as 32-byte big-endian values that must be
//! strictly below the curve order. Points cross as affine `(x, y)` pairs of
//! 32 bytes each and must lie on the curve. Text formats use lowercase hex.

use crate::{Error, Result};
use k256::{
    elliptic_curve::{
        sec1::{FromEncodedPoint, ToEncodedPoint},
        PrimeField,
    },
    AffinePoint, EncodedPoint, FieldBytes, ProjectivePoint, Scalar,
};
use serde::{Deserialize, Serialize};

/// Width of an encoded scalar or coordinate
pub const SCALAR_LEN: usize = 32;

/// Encode a scalar as 32 big-endian bytes
pub fn scalar_to_bytes(scalar: &Scalar) -> [u8; SCALAR_LEN] {
    let mut out = [0u8; SCALAR_LEN];
    out.copy_from_slice(&scalar.to_bytes());
    out
}

/// Decode a 32-byte big-endian scalar, rejecting values `>= order`
pub fn scalar_from_bytes(bytes: &[u8]) -> Result<Scalar> {
    if bytes.len() != SCALAR_LEN {
        return Err(Error::MalformedInput(format!(
            "Scalar must be {} bytes, got {}",
            SCALAR_LEN,
            bytes.len()
        )));
    }
    let repr = FieldBytes::clone_from_slice(bytes);
    Option::<Scalar>::from(Scalar::from_repr(repr))
        .ok_or_else(|| Error::MalformedInput("Scalar is not below the curve order".into()))
}

/// Affine coordinates of a point; the identity has none
pub fn point_to_coordinates(point: &ProjectivePoint) -> Result<([u8; 32], [u8; 32])> {
    let encoded = point.to_affine().to_encoded_point(false);
    match (encoded.x(), encoded.y()) {
        (Some(x), Some(y)) => {
            let mut x_out = [0u8; 32];
            let mut y_out = [0u8; 32];
            x_out.copy_from_slice(x);
            y_out.copy_from_slice(y);
            Ok((x_out, y_out))
        }
        _ => Err(Error::MalformedInput(
            "Identity point has no affine coordinates".into(),
        )),
    }
}

/// Decode an affine `(x, y)` pair, rejecting wrong lengths and off-curve points
pub fn point_from_coordinates(x: &[u8], y: &[u8]) -> Result<ProjectivePoint> {
    if x.len() != 32 || y.len() != 32 {
        return Err(Error::MalformedInput(format!(
            "Point coordinates must be 32 bytes each, got {} and {}",
            x.len(),
            y.len()
        )));
    }
    let encoded = EncodedPoint::from_affine_coordinates(
        &FieldBytes::clone_from_slice(x),
        &FieldBytes::clone_from_slice(y),
        false,
    );
    let affine_opt = AffinePoint::from_encoded_point(&encoded);
    let affine: AffinePoint = Option::<AffinePoint>::from(affine_opt)
        .ok_or_else(|| Error::MalformedInput("Point is not on the curve".into()))?;
    Ok(ProjectivePoint::from(affine))
}

/// SEC1 uncompressed encoding used as hash input
pub(crate) fn point_to_sec1(point: &ProjectivePoint) -> EncodedPoint {
    point.to_affine().to_encoded_point(false)
}

/// Parity of the affine `y` coordinate, read from the compressed prefix
pub(crate) fn y_is_odd(point: &ProjectivePoint) -> bool {
    let compressed = point.to_affine().to_encoded_point(true);
    compressed.as_bytes()[0] == 0x03
}

fn decode_hex32<E: serde::de::Error>(value: &str) -> std::result::Result<Vec<u8>, E> {
    let bytes = hex::decode(value).map_err(E::custom)?;
    if bytes.len() != 32 {
        return Err(E::custom(format!("expected 32 bytes, got {}", bytes.len())));
    }
    Ok(bytes)
}

/// Scalars as 64-character hex strings
pub(crate) mod scalar_hex {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(scalar: &Scalar, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(scalar_to_bytes(scalar)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<Scalar, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        let bytes = decode_hex32::<D::Error>(&text)?;
        scalar_from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

/// 32-byte arrays as hex strings
pub(crate) mod bytes32_hex {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8; 32], serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        let bytes = decode_hex32::<D::Error>(&text)?;
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Ok(out)
    }
}

#[derive(Serialize, Deserialize)]
struct AffineXy {
    x: String,
    y: String,
}

impl AffineXy {
    fn from_point<E: serde::ser::Error>(point: &ProjectivePoint) -> std::result::Result<Self, E> {
        let (x, y) = point_to_coordinates(point).map_err(E::custom)?;
        Ok(Self {
            x: hex::encode(x),
            y: hex::encode(y),
        })
    }

    fn into_point<E: serde::de::Error>(self) -> std::result::Result<ProjectivePoint, E> {
        let x = decode_hex32::<E>(&self.x)?;
        let y = decode_hex32::<E>(&self.y)?;
        point_from_coordinates(&x, &y).map_err(E::custom)
    }
}

/// Points as `{ "x": hex, "y": hex }`
pub(crate) mod point_xy {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(point: &ProjectivePoint, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        AffineXy::from_point::<S::Error>(point)?.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<ProjectivePoint, D::Error>
    where
        D: Deserializer<'de>,
    {
        AffineXy::deserialize(deserializer)?.into_point::<D::Error>()
    }
}

/// Lists of points, each as `{ "x": hex, "y": hex }`
pub(crate) mod points_xy {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(points: &[ProjectivePoint], serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let encoded = points
            .iter()
            .map(AffineXy::from_point::<S::Error>)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        encoded.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<Vec<ProjectivePoint>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Vec::<AffineXy>::deserialize(deserializer)?
            .into_iter()
            .map(AffineXy::into_point::<D::Error>)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_rejects_order_and_wrong_length() {
        // secp256k1 group order n
        let order =
            hex::decode("fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141").unwrap();
        assert!(matches!(scalar_from_bytes(&order), Err(Error::MalformedInput(_))));
        assert!(matches!(scalar_from_bytes(&[0u8; 31]), Err(Error::MalformedInput(_))));
        assert!(matches!(scalar_from_bytes(&[0u8; 33]), Err(Error::MalformedInput(_))));

        let below =
            hex::decode("fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364140").unwrap();
        let scalar = scalar_from_bytes(&below).unwrap();
        assert_eq!(scalar, -Scalar::ONE);
        assert_eq!(scalar_to_bytes(&scalar).to_vec(), below);
    }

    #[test]
    fn test_point_coordinates() {
        let point = ProjectivePoint::GENERATOR * Scalar::from(7u64);
        let (x, y) = point_to_coordinates(&point).unwrap();
        assert_eq!(point_from_coordinates(&x, &y).unwrap(), point);

        let mut off_curve = y;
        off_curve[31] ^= 1;
        assert!(matches!(
            point_from_coordinates(&x, &off_curve),
            Err(Error::MalformedInput(_))
        ));
        assert!(point_to_coordinates(&ProjectivePoint::IDENTITY).is_err());
    }

    #[test]
    fn test_generator_parity() {
        // G.y = 0x483ada77...10d4b8, even
        assert!(!y_is_odd(&ProjectivePoint::GENERATOR));
        assert!(y_is_odd(&-ProjectivePoint::GENERATOR));
    }
}
