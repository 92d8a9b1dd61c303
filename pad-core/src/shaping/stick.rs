//! Two-axis stick shaping.

use fixed_macro::fixed;
use pad_proto::range;

use crate::fix16::Fix16;
use crate::profile::StickSettingsRaw;

const ZERO: Fix16 = Fix16::ZERO;
const ONE: Fix16 = Fix16::ONE;
const DEG_45: Fix16 = Fix16::from_fixed(fixed!(45: I16F16));
const DEG_90: Fix16 = Fix16::from_fixed(fixed!(90: I16F16));
const DEG_180: Fix16 = Fix16::from_fixed(fixed!(180: I16F16));
const EPSILON: Fix16 = Fix16::from_fixed(fixed!(0.0001: I16F16));
const EPSILON2: Fix16 = Fix16::from_fixed(fixed!(0.001: I16F16));
/// Ellipse angle used when the computed one comes out negative.
const ELLIPSE_DEFAULT: Fix16 = Fix16::from_fixed(fixed!(1.570796: I16F16));
/// `1 - 1/sqrt(2)`: the diagonal compensation reaches full strength at 45 degrees.
const DIAG_DIVISOR: Fix16 = Fix16::from_fixed(fixed!(0.29289: I16F16));
/// Hundredths stored for restriction thresholds.
const RESTRICT_SCALE: Fix16 = Fix16::from_fixed(fixed!(100: I16F16));

/// Working stick parameters, derived from a [`StickSettingsRaw`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StickSettings {
    pub dz_inner: Fix16,
    pub dz_outer: Fix16,
    pub anti_dz_circle: Fix16,
    pub anti_dz_circle_y_scale: Fix16,
    pub anti_dz_square: Fix16,
    pub anti_dz_square_y_scale: Fix16,
    pub anti_dz_angular: Fix16,
    pub anti_dz_outer: Fix16,
    /// Axis-lock threshold, as a fraction of full deflection.
    pub axis_restrict: Fix16,
    /// Angle-restriction threshold in degrees.
    pub angle_restrict: Fix16,
    pub diag_scale_min: Fix16,
    pub diag_scale_max: Fix16,
    pub curve: Fix16,
    pub uncap_radius: bool,
    pub invert_y: bool,
    pub invert_x: bool,
}

impl StickSettings {
    /// Scale the stored hundredths of `axis_restrict`, `angle_restrict` and
    /// `anti_dz_angular` up to their working values.
    #[must_use]
    pub fn from_raw(raw: &StickSettingsRaw) -> Self {
        Self {
            dz_inner: raw.dz_inner,
            dz_outer: raw.dz_outer,
            anti_dz_circle: raw.anti_dz_circle,
            anti_dz_circle_y_scale: raw.anti_dz_circle_y_scale,
            anti_dz_square: raw.anti_dz_square,
            anti_dz_square_y_scale: raw.anti_dz_square_y_scale,
            anti_dz_angular: raw.anti_dz_angular * RESTRICT_SCALE,
            anti_dz_outer: raw.anti_dz_outer,
            axis_restrict: raw.axis_restrict * RESTRICT_SCALE,
            angle_restrict: raw.angle_restrict * RESTRICT_SCALE,
            diag_scale_min: raw.diag_scale_min,
            diag_scale_max: raw.diag_scale_max,
            curve: raw.curve,
            uncap_radius: raw.uncap_radius,
            invert_y: raw.invert_y,
            invert_x: raw.invert_x,
        }
    }
}

impl Default for StickSettings {
    fn default() -> Self {
        Self::from_raw(&StickSettingsRaw::DEFAULT)
    }
}

/// `num / den`, or zero when `den` is zero.
#[inline]
fn ratio(num: Fix16, den: Fix16) -> Fix16 {
    num.checked_div(den).unwrap_or(ZERO)
}

/// Angle of `(x, y)` folded into the first quadrant, in degrees.
#[inline]
fn first_quadrant_angle(x: Fix16, y: Fix16) -> Fix16 {
    if x.abs() < EPSILON {
        DEG_90
    } else {
        (y / x).atan().abs().rad_to_deg()
    }
}

#[inline]
fn to_axis(value: Fix16) -> i16 {
    let scaled = value.clamp(-ONE, ONE) * Fix16::from_int(i32::from(i16::MAX));
    scaled
        .to_int_round()
        .clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

/// Shape one stick sample.
///
/// `invert_y` is the caller's Y convention and is XOR-ed with the profile's
/// own `invert_y`. Magnitudes at or below `dz_inner` return exactly `(0, 0)`.
#[must_use]
pub fn shape(raw_x: i16, raw_y: i16, set: &StickSettings, invert_y: bool) -> (i16, i16) {
    let full = Fix16::from_int(i32::from(i16::MAX));
    let raw_x = if set.invert_x { range::invert(raw_x) } else { raw_x };
    let raw_y = if set.invert_y ^ invert_y {
        range::invert(raw_y)
    } else {
        raw_y
    };
    let x = Fix16::from(raw_x) / full;
    let y = Fix16::from(raw_y) / full;

    let abs_x = x.abs();
    let abs_y = y.abs();
    let inv_axis_restrict = ratio(ONE, ONE - set.axis_restrict);

    let raw_angle = first_quadrant_angle(x, y);

    let axial_x = if abs_x <= set.axis_restrict && raw_angle > DEG_45 {
        ZERO
    } else {
        (abs_x - set.axis_restrict) * inv_axis_restrict
    };
    let axial_y = if abs_y <= set.axis_restrict && raw_angle <= DEG_45 {
        ZERO
    } else {
        (abs_y - set.axis_restrict) * inv_axis_restrict
    };

    let in_magnitude = (axial_x.sq() + axial_y.sq()).sqrt();
    if in_magnitude <= set.dz_inner {
        return (0, 0);
    }

    let mut angle = first_quadrant_angle(axial_x, axial_y);

    let anti_r_scale = if set.anti_dz_square_y_scale == ZERO {
        set.anti_dz_square
    } else {
        set.anti_dz_square_y_scale
    };
    let mut anti_dz_c = set.anti_dz_circle;

    if anti_r_scale > ZERO && anti_dz_c > ZERO {
        // The ellipse scale has never been seeded with the circle/square
        // ratio, so it is always zero here and the ellipse collapses the
        // circular anti-deadzone. Tuned profiles depend on this.
        let anti_ellip_scale = ZERO / anti_dz_c;
        let mut ellipse_angle = ((ONE / anti_ellip_scale) * raw_angle.rad_to_deg().tan()).atan();
        if ellipse_angle < ZERO {
            ellipse_angle = ELLIPSE_DEFAULT;
        }
        let ellipse_x = ellipse_angle.cos();
        let ellipse_y = (anti_ellip_scale.sq() * (ONE - ellipse_x.sq())).sqrt();
        anti_dz_c *= (ellipse_x.sq() + ellipse_y.sq()).sqrt();
    }

    if anti_dz_c > ZERO {
        // Unguarded: a zero share divides to Fix16::MIN, so a square
        // anti-deadzone of 1.0 collapses the circular radius to zero.
        let circle_share = anti_dz_c * (ONE - set.anti_dz_circle / set.dz_outer);
        let square_share = anti_dz_c * (ONE - set.anti_dz_square);
        anti_dz_c = anti_dz_c / (circle_share / square_share);
    }

    if abs_x > set.axis_restrict && abs_y > set.axis_restrict {
        let angle_max = set.angle_restrict / Fix16::from_int(2);

        if angle > ZERO && angle < angle_max {
            angle = ZERO;
        }
        if angle > DEG_90 - angle_max {
            angle = DEG_90;
        }
        if angle > angle_max && angle < DEG_90 - angle_max {
            angle = if (angle - DEG_45).abs() < angle_max {
                DEG_45
            } else {
                ((angle - angle_max) * DEG_90) / ((DEG_90 - angle_max) - angle_max)
            };
        }
    }

    let ref_angle = if angle < EPSILON2 { ZERO } else { angle };
    let diagonal = if angle > DEG_45 {
        (((angle - DEG_45) * -DEG_45) / DEG_45) + DEG_45
    } else {
        angle
    };

    let angle_comp = set.angle_restrict / Fix16::from_int(2);
    if angle < DEG_90 && angle > ZERO {
        angle = ((angle * ((DEG_90 - angle_comp) - angle_comp)) / DEG_90) + angle_comp;
    }

    if axial_x < ZERO && axial_y > ZERO {
        angle = -angle;
    }
    if axial_x > ZERO && axial_y < ZERO {
        angle -= DEG_180;
    }
    if axial_x < ZERO && axial_y < ZERO {
        angle += DEG_180;
    }

    // deadzone warp
    let travel = (in_magnitude - set.dz_inner)
        .checked_div(set.anti_dz_outer - set.dz_inner)
        .unwrap_or(ONE);
    let exponent = ONE.checked_div(set.curve).unwrap_or(ONE);
    let mut out_magnitude = travel.pow(exponent) * (set.dz_outer - anti_dz_c) + anti_dz_c;
    if out_magnitude > set.dz_outer && !set.uncap_radius {
        out_magnitude = set.dz_outer;
    }

    // diagonal compensation, strongest at 45 degrees on a circular curve
    let mut d_scale = ratio(
        (out_magnitude - anti_dz_c) * (set.diag_scale_max - set.diag_scale_min),
        set.dz_outer - anti_dz_c,
    ) + set.diag_scale_min;
    let mut c_scale = (diagonal * (ONE / Fix16::from_int(2).sqrt())) / DEG_45;
    c_scale = ONE - (ONE - c_scale * c_scale).sqrt();
    d_scale = (c_scale * (d_scale - ONE)) / DIAG_DIVISOR + ONE;
    out_magnitude *= d_scale;

    let new_x = angle.cos_deg() * out_magnitude;
    let new_y = angle.sin_deg() * out_magnitude;

    // square anti-deadzone; a pure cardinal push stays pure
    let mut output_x =
        new_x.abs() * (ONE - ratio(set.anti_dz_square, set.dz_outer)) + set.anti_dz_square;
    if x < ZERO {
        output_x = -output_x;
    }
    if ref_angle == DEG_90 {
        output_x = ZERO;
    }

    let mut output_y = new_y.abs() * (ONE - ratio(anti_r_scale, set.dz_outer)) + anti_r_scale;
    if y < ZERO {
        output_y = -output_y;
    }
    if ref_angle == ZERO {
        output_y = ZERO;
    }

    (to_axis(output_x), to_axis(output_y))
}
