use nalgebra::{Matrix3, Matrix4, Vector3};

/// RELION Euler angles in degrees, ZYZ convention.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EulerAngles {
    pub rot: f64,
    pub tilt: f64,
    pub psi: f64,
}

/// Rotation matrix for static-frame ZYZ Euler angles given in radians.
fn zyz_rotation(rot: f64, tilt: f64, psi: f64) -> Matrix3<f64> {
    let (si, ci) = rot.sin_cos();
    let (sj, cj) = tilt.sin_cos();
    let (sk, ck) = psi.sin_cos();
    let (cc, cs) = (ci * ck, ci * sk);
    let (sc, ss) = (si * ck, si * sk);

    // Axis indices of the repeated-axis ZYZ sequence: i = z, j = y, k = x.
    let (i, j, k) = (2, 1, 0);
    let mut m = Matrix3::zeros();
    m[(i, i)] = cj;
    m[(i, j)] = sj * si;
    m[(i, k)] = sj * ci;
    m[(j, i)] = sj * sk;
    m[(j, j)] = -cj * ss + cc;
    m[(j, k)] = -cj * cs - sc;
    m[(k, i)] = -sj * ck;
    m[(k, j)] = cj * sc + cs;
    m[(k, k)] = cj * cc - ss;
    m
}

/// Builds the 4x4 homogeneous transform of a particle from its RELION shifts (pixels)
/// and Euler angles (degrees).
///
/// With `invert`, the shifts are negated and the resulting transform inverted, which
/// maps the particle frame back onto the tomogram frame.
pub fn transform_matrix(shifts: Vector3<f64>, angles: EulerAngles, invert: bool) -> Matrix4<f64> {
    let rotation = zyz_rotation(
        angles.rot.to_radians(),
        angles.tilt.to_radians(),
        angles.psi.to_radians(),
    );

    if invert {
        // Inverse of [R | -s] is [R^T | R^T s].
        let rotation_t = rotation.transpose();
        compose(&rotation_t, &(rotation_t * shifts))
    } else {
        compose(&rotation, &shifts)
    }
}

fn compose(rotation: &Matrix3<f64>, translation: &Vector3<f64>) -> Matrix4<f64> {
    let mut m = Matrix4::identity();
    m.fixed_view_mut::<3, 3>(0, 0).copy_from(rotation);
    m.fixed_view_mut::<3, 1>(0, 3).copy_from(translation);
    m
}
