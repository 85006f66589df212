//! Transform decoding, composition and normalization
//!
//! MVR stores a node's placement as a flattened 4x3 matrix: three basis
//! vectors (right, up, forward) followed by a translation, written as
//! `{u1,u2,u3}{v1,v2,v3}{w1,w2,w3}{o1,o2,o3}`. In memory every transform is a
//! [`Matrix4`] in column-vector convention: the basis vectors are columns 0..2
//! and the translation is column 3, so `world = parent_world * local`.
//!
//! GDTF geometry positions are full 4x4 matrices written row by row.

use crate::error::{Error, Result};
use nalgebra::{Matrix4, Rotation3, UnitQuaternion, Vector3};

/// Number of values in a flattened 4x3 transform
pub const TRANSFORM_MATRIX_SIZE: usize = 12;

/// Number of values in a full 4x4 matrix
pub const FULL_MATRIX_SIZE: usize = 16;

/// Scale factors below this are treated as degenerate
const SCALE_EPSILON: f64 = 1e-12;

/// Decimal places kept when formatting matrix values
const FLOAT_PRECISION: f64 = 1e9;

/// A flattened 4x3 transform as stored on the wire
///
/// Layout: `[right(3), up(3), forward(3), translation(3)]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// The twelve matrix values in wire order
    pub values: [f64; TRANSFORM_MATRIX_SIZE],
}

impl Transform {
    /// The identity transform
    pub fn identity() -> Self {
        Self {
            values: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0],
        }
    }

    /// Parse the wire text of a matrix
    ///
    /// Accepts the braced MVR form as well as plain comma or whitespace
    /// separated lists. Sixteen values are read as a row-major 4x4 matrix.
    pub fn parse(text: &str) -> Result<Self> {
        let values = parse_numbers(text)?;
        match values.len() {
            TRANSFORM_MATRIX_SIZE => {
                let mut out = [0.0; TRANSFORM_MATRIX_SIZE];
                out.copy_from_slice(&values);
                Ok(Self { values: out })
            }
            FULL_MATRIX_SIZE => Ok(Self::from_matrix(&matrix_from_rows(&values))),
            n => Err(Error::ParseError(format!(
                "Transform matrix must have {} values (got {})",
                TRANSFORM_MATRIX_SIZE, n
            ))),
        }
    }

    /// Build the wire form of a 4x4 matrix
    ///
    /// The projective row is dropped; callers pass affine matrices.
    pub fn from_matrix(m: &Matrix4<f64>) -> Self {
        let mut values = [0.0; TRANSFORM_MATRIX_SIZE];
        for column in 0..4 {
            for row in 0..3 {
                values[column * 3 + row] = m[(row, column)];
            }
        }
        Self { values }
    }

    /// Expand into a 4x4 matrix
    pub fn to_matrix(&self) -> Matrix4<f64> {
        let v = &self.values;
        Matrix4::new(
            v[0], v[3], v[6], v[9], //
            v[1], v[4], v[7], v[10], //
            v[2], v[5], v[8], v[11], //
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// Whether every value is the identity value
    pub fn is_identity(&self) -> bool {
        self.values == Self::identity().values
    }

    /// Format as `{a,b,c}{d,e,f}{g,h,i}{x,y,z}`
    pub fn to_wire_string(&self) -> String {
        self.values
            .chunks(3)
            .map(|row| {
                format!(
                    "{{{},{},{}}}",
                    format_float(row[0]),
                    format_float(row[1]),
                    format_float(row[2])
                )
            })
            .collect()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl std::fmt::Display for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_wire_string())
    }
}

fn parse_numbers(text: &str) -> Result<Vec<f64>> {
    text.split(|c: char| c == '{' || c == '}' || c == ',' || c == ';' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| {
            let value = s
                .parse::<f64>()
                .map_err(|_| Error::parse_error_with_context("matrix value", s, "number"))?;
            if value.is_finite() {
                Ok(value)
            } else {
                Err(Error::parse_error_with_context(
                    "matrix value",
                    s,
                    "finite number",
                ))
            }
        })
        .collect()
}

fn matrix_from_rows(values: &[f64]) -> Matrix4<f64> {
    Matrix4::new(
        values[0], values[1], values[2], values[3], //
        values[4], values[5], values[6], values[7], //
        values[8], values[9], values[10], values[11], //
        values[12], values[13], values[14], values[15],
    )
}

/// Parse a GDTF `Position` attribute (row-major 4x4)
pub fn parse_position(text: &str) -> Result<Matrix4<f64>> {
    let values = parse_numbers(text)?;
    match values.len() {
        FULL_MATRIX_SIZE => Ok(matrix_from_rows(&values)),
        TRANSFORM_MATRIX_SIZE => Ok(Transform::parse(text)?.to_matrix()),
        n => Err(Error::ParseError(format!(
            "Position matrix must have {} values (got {})",
            FULL_MATRIX_SIZE, n
        ))),
    }
}

/// Format a matrix value with a fixed precision and no trailing zeros
pub fn format_float(value: f64) -> String {
    let rounded = (value * FLOAT_PRECISION).round() / FLOAT_PRECISION;
    if rounded == 0.0 {
        "0".to_string()
    } else {
        format!("{}", rounded)
    }
}

/// What happens to shear when a matrix is normalized
///
/// Some producers bake scale into non-orthonormal basis vectors. Normalizing
/// rebuilds the matrix from translation, rotation and per-axis scale, which
/// drops any shear. Whether a real producer relies on shear is unknown, so
/// the behavior can be switched off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShearPolicy {
    /// Rebuild from location, rotation and scale (drops shear)
    #[default]
    Normalize,
    /// Keep the raw 3x3 block
    Preserve,
}

/// A matrix split into location, rotation and scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decomposed {
    /// Translation
    pub translation: Vector3<f64>,
    /// Rotation
    pub rotation: UnitQuaternion<f64>,
    /// Per-axis scale; a mirrored matrix has a negative x scale
    pub scale: Vector3<f64>,
}

impl Decomposed {
    /// Recompose into a matrix: translation * rotation * scale
    pub fn compose(&self) -> Matrix4<f64> {
        Matrix4::new_translation(&self.translation)
            * self.rotation.to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&self.scale)
    }
}

/// Split an affine matrix into translation, rotation and scale
///
/// The rotation is the orthonormalized basis (Gram-Schmidt on the columns),
/// so any shear present in the input is discarded.
pub fn decompose(m: &Matrix4<f64>) -> Decomposed {
    let translation = Vector3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)]);
    let c0 = Vector3::new(m[(0, 0)], m[(1, 0)], m[(2, 0)]);
    let c1 = Vector3::new(m[(0, 1)], m[(1, 1)], m[(2, 1)]);
    let c2 = Vector3::new(m[(0, 2)], m[(1, 2)], m[(2, 2)]);

    let mut scale = Vector3::new(c0.norm(), c1.norm(), c2.norm());
    let basis = m.fixed_view::<3, 3>(0, 0).into_owned();
    let mirrored = basis.determinant() < 0.0;
    if mirrored {
        scale.x = -scale.x;
    }

    if scale.iter().any(|s| s.abs() < SCALE_EPSILON) {
        return Decomposed {
            translation,
            rotation: UnitQuaternion::identity(),
            scale,
        };
    }

    let x = c0 / scale.x;
    let y = (c1 - x * x.dot(&c1)).normalize();
    let z = x.cross(&y);

    let rotation = Rotation3::from_matrix_unchecked(nalgebra::Matrix3::from_columns(&[x, y, z]));
    Decomposed {
        translation,
        rotation: UnitQuaternion::from_rotation_matrix(&rotation),
        scale,
    }
}

/// Apply the shear policy to a matrix
pub fn normalize(m: &Matrix4<f64>, policy: ShearPolicy) -> Matrix4<f64> {
    match policy {
        ShearPolicy::Normalize => decompose(m).compose(),
        ShearPolicy::Preserve => *m,
    }
}

/// Where a node's local matrix comes from, in order of precedence
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocalSource<'a> {
    /// A matrix written on the node itself
    Explicit(&'a Transform),
    /// A live transform attached to an in-memory placeholder object
    Placeholder(&'a Matrix4<f64>),
    /// Nothing was given
    Identity,
}

impl<'a> LocalSource<'a> {
    /// Pick the first available encoding
    pub fn select(explicit: Option<&'a Transform>, placeholder: Option<&'a Matrix4<f64>>) -> Self {
        match (explicit, placeholder) {
            (Some(t), _) => LocalSource::Explicit(t),
            (None, Some(m)) => LocalSource::Placeholder(m),
            (None, None) => LocalSource::Identity,
        }
    }

    /// Resolve to a local matrix
    pub fn resolve(&self, policy: ShearPolicy) -> Matrix4<f64> {
        match self {
            LocalSource::Explicit(t) => normalize(&t.to_matrix(), policy),
            LocalSource::Placeholder(m) => normalize(m, policy),
            LocalSource::Identity => Matrix4::identity(),
        }
    }
}

/// Compose a node's world matrix, parent first
pub fn world_matrix(local: &Matrix4<f64>, parent_world: &Matrix4<f64>) -> Matrix4<f64> {
    parent_world * local
}

/// Matrix of `object_world` expressed in the frame of `parent_world`
///
/// Returns `None` when the parent frame is singular.
pub fn relative_matrix(
    parent_world: &Matrix4<f64>,
    object_world: &Matrix4<f64>,
) -> Option<Matrix4<f64>> {
    parent_world.try_inverse().map(|inv| inv * object_world)
}

/// Signed coordinate axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// +X
    X,
    /// +Y
    Y,
    /// +Z
    Z,
    /// -X
    NegX,
    /// -Y
    NegY,
    /// -Z
    NegZ,
}

impl Axis {
    /// Unit vector of this axis
    pub fn vector(&self) -> Vector3<f64> {
        match self {
            Axis::X => Vector3::x(),
            Axis::Y => Vector3::y(),
            Axis::Z => Vector3::z(),
            Axis::NegX => -Vector3::x(),
            Axis::NegY => -Vector3::y(),
            Axis::NegZ => -Vector3::z(),
        }
    }
}

impl std::str::FromStr for Axis {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "X" => Ok(Axis::X),
            "Y" => Ok(Axis::Y),
            "Z" => Ok(Axis::Z),
            "-X" => Ok(Axis::NegX),
            "-Y" => Ok(Axis::NegY),
            "-Z" => Ok(Axis::NegZ),
            other => Err(Error::parse_error_with_context("axis", other, "one of X, Y, Z, -X, -Y, -Z")),
        }
    }
}

/// Global coordinate conversion applied once at the scene root
///
/// Remaps the source convention (`forward`, `up`) to the native Y-forward,
/// Z-up convention and applies a uniform scale factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalTransform {
    forward: Axis,
    up: Axis,
    scale: f64,
    matrix: Matrix4<f64>,
}

impl GlobalTransform {
    /// Build a conversion from source axes and a scale factor
    pub fn new(forward: Axis, up: Axis, scale: f64) -> Result<Self> {
        let f = forward.vector();
        let u = up.vector();
        let r = f.cross(&u);
        if r.norm() < 0.5 {
            return Err(Error::Unsupported(format!(
                "Forward axis {:?} and up axis {:?} must be perpendicular",
                forward, up
            )));
        }
        if !scale.is_finite() || scale <= 0.0 {
            return Err(Error::Unsupported(format!(
                "Scale factor must be positive and finite (got {})",
                scale
            )));
        }

        let remap = Matrix4::new(
            r.x, r.y, r.z, 0.0, //
            f.x, f.y, f.z, 0.0, //
            u.x, u.y, u.z, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        );
        Ok(Self {
            forward,
            up,
            scale,
            matrix: Matrix4::new_scaling(scale) * remap,
        })
    }

    /// The identity conversion (Y forward, Z up, scale 1)
    pub fn identity() -> Self {
        Self {
            forward: Axis::Y,
            up: Axis::Z,
            scale: 1.0,
            matrix: Matrix4::identity(),
        }
    }

    /// Source forward axis
    pub fn forward(&self) -> Axis {
        self.forward
    }

    /// Source up axis
    pub fn up(&self) -> Axis {
        self.up
    }

    /// Uniform scale factor
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// The conversion matrix
    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.matrix
    }
}

impl Default for GlobalTransform {
    fn default() -> Self {
        Self::identity()
    }
}
