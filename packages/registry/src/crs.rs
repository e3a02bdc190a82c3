//! Coordinate reference systems declared by `.prj` sidecars.
//!
//! INEGI distributes the DENUE points in geographic coordinates but the
//! Marco Geoestadístico layers (blocks, localities) in the national
//! Lambert Conformal Conic projection. Everything downstream works in
//! WGS84 degrees, so projected layers are converted on load.
//!
//! Only the projections INEGI and UTM-based state layers use are
//! supported: Lambert Conformal Conic (one or two standard parallels) and
//! Transverse Mercator. Inverse formulas follow Snyder, *Map Projections:
//! A Working Manual* (USGS PP 1395). Datum shifts are ignored; ITRF2008
//! and WGS84 agree to well under a metre.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};
use std::path::Path;
use std::sync::LazyLock;

use denue_radius_registry_models::Coordinate;
use regex::Regex;

use crate::RegistryError;

static PROJECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"projection\["([^"]+)""#).unwrap_or_else(|_| unreachable!())
});

static PARAMETER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"parameter\["([^"]+)"[ \t\r\n]*,[ \t\r\n]*([-+0-9.e]+)"#)
        .unwrap_or_else(|_| unreachable!())
});

static SPHEROID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:spheroid|ellipsoid)\["[^"]*"[ \t\r\n]*,[ \t\r\n]*([0-9.e+]+)[ \t\r\n]*,[ \t\r\n]*([0-9.e+]+)"#)
        .unwrap_or_else(|_| unreachable!())
});

static UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"unit\["[^"]*"[ \t\r\n]*,[ \t\r\n]*([0-9.e+-]+)"#).unwrap_or_else(|_| unreachable!())
});

/// Reference ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    /// Semi-major axis in meters.
    pub semi_major: f64,
    /// Inverse flattening; zero for a sphere.
    pub inverse_flattening: f64,
}

impl Ellipsoid {
    pub const GRS80: Self = Self {
        semi_major: 6_378_137.0,
        inverse_flattening: 298.257_222_101,
    };

    pub const WGS84: Self = Self {
        semi_major: 6_378_137.0,
        inverse_flattening: 298.257_223_563,
    };

    #[must_use]
    pub fn eccentricity_squared(&self) -> f64 {
        if self.inverse_flattening <= 0.0 {
            return 0.0;
        }
        let f = 1.0 / self.inverse_flattening;
        f.mul_add(-f, 2.0 * f)
    }
}

/// Supported projection methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionKind {
    LambertConformalConic,
    TransverseMercator,
}

/// A projected CRS: method, ellipsoid and parameters in degrees/meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub kind: ProjectionKind,
    pub ellipsoid: Ellipsoid,
    pub latitude_of_origin: f64,
    pub central_meridian: f64,
    /// Equal for one-standard-parallel (tangent) cones.
    pub standard_parallels: (f64, f64),
    pub scale_factor: f64,
    pub false_easting: f64,
    pub false_northing: f64,
    /// Meters per linear unit of the projected coordinates.
    pub unit: f64,
}

/// The CRS of a layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Crs {
    /// Longitude/latitude degrees, used as-is.
    Geographic,
    /// Projected coordinates, converted with the inverse projection.
    Projected(Projection),
}

impl Crs {
    /// Converts a layer `(x, y)` pair to geographic coordinates.
    #[must_use]
    pub fn to_geographic(&self, x: f64, y: f64) -> Coordinate {
        match self {
            Self::Geographic => Coordinate::new(y, x),
            Self::Projected(projection) => {
                let (longitude, latitude) = projection.inverse(x, y);
                Coordinate::new(latitude, longitude)
            }
        }
    }
}

/// Reads the `.prj` sidecar next to `layer_path`. A layer without one is
/// taken to be geographic.
///
/// # Errors
///
/// Returns [`RegistryError::UnsupportedCrs`] if the sidecar declares a
/// projection that cannot be inverted, or [`RegistryError::Io`] if it
/// exists but cannot be read.
pub fn read_prj(layer_path: &Path) -> Result<Crs, RegistryError> {
    let prj = layer_path.with_extension("prj");
    if !prj.is_file() {
        log::debug!("No .prj sidecar at {}, assuming WGS84", prj.display());
        return Ok(Crs::Geographic);
    }

    let crs = parse_wkt(&std::fs::read_to_string(&prj)?)?;
    if let Crs::Projected(projection) = &crs {
        log::info!(
            "{} is projected ({:?}); reprojecting to WGS84",
            layer_path.display(),
            projection.kind
        );
    }
    Ok(crs)
}

/// Parses an ESRI or OGC WKT1 CRS definition.
///
/// # Errors
///
/// Returns [`RegistryError::UnsupportedCrs`] for unknown CRS types and
/// unsupported projection methods.
pub fn parse_wkt(wkt: &str) -> Result<Crs, RegistryError> {
    let text = wkt.trim().to_ascii_lowercase();

    if text.starts_with("geogcs") || text.starts_with("geogcrs") || text.starts_with("geodcrs") {
        return Ok(Crs::Geographic);
    }
    if !text.starts_with("projcs") {
        return Err(RegistryError::UnsupportedCrs {
            crs: wkt.chars().take(60).collect(),
        });
    }

    let method = PROJECTION
        .captures(&text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| RegistryError::UnsupportedCrs {
            crs: "PROJCS without PROJECTION".to_string(),
        })?;

    let kind = if method.contains("lambert_conformal_conic") {
        ProjectionKind::LambertConformalConic
    } else if method.contains("transverse_mercator") {
        ProjectionKind::TransverseMercator
    } else {
        return Err(RegistryError::UnsupportedCrs { crs: method });
    };

    let parameter = |names: &[&str]| -> Option<f64> {
        PARAMETER.captures_iter(&text).find_map(|c| {
            let name = c.get(1)?.as_str();
            if names.contains(&name) {
                c.get(2)?.as_str().parse().ok()
            } else {
                None
            }
        })
    };

    let ellipsoid = SPHEROID
        .captures(&text)
        .and_then(|c| {
            Some(Ellipsoid {
                semi_major: c.get(1)?.as_str().parse().ok()?,
                inverse_flattening: c.get(2)?.as_str().parse().ok()?,
            })
        })
        .unwrap_or(Ellipsoid::GRS80);

    let unit = UNIT
        .captures_iter(&text)
        .last()
        .and_then(|c| c.get(1)?.as_str().parse().ok())
        .filter(|u: &f64| *u > 0.0)
        .unwrap_or(1.0);

    let latitude_of_origin =
        parameter(&["latitude_of_origin", "latitude_of_center"]).unwrap_or(0.0);
    let first_parallel = parameter(&["standard_parallel_1"]).unwrap_or(latitude_of_origin);
    let second_parallel = parameter(&["standard_parallel_2"]).unwrap_or(first_parallel);

    Ok(Crs::Projected(Projection {
        kind,
        ellipsoid,
        latitude_of_origin,
        central_meridian: parameter(&[
            "central_meridian",
            "longitude_of_origin",
            "longitude_of_center",
        ])
        .unwrap_or(0.0),
        standard_parallels: (first_parallel, second_parallel),
        scale_factor: parameter(&["scale_factor"]).unwrap_or(1.0),
        false_easting: parameter(&["false_easting"]).unwrap_or(0.0),
        false_northing: parameter(&["false_northing"]).unwrap_or(0.0),
        unit,
    }))
}

/// Meridional arc length from the equator to `phi` (Snyder 3-21).
#[allow(clippy::suboptimal_flops)]
fn meridional_arc(a: f64, e2: f64, phi: f64) -> f64 {
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    a * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
        - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
        + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
        - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
}

/// Cone constants of a Lambert Conformal Conic projection.
struct Cone {
    e: f64,
    n: f64,
    /// `a * F * k0`.
    af: f64,
    rho0: f64,
}

#[allow(clippy::suboptimal_flops, clippy::similar_names)]
impl Projection {
    /// Converts projected `(x, y)` to `(longitude, latitude)` degrees.
    #[must_use]
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let x = (x - self.false_easting) * self.unit;
        let y = (y - self.false_northing) * self.unit;
        match self.kind {
            ProjectionKind::LambertConformalConic => self.lcc_inverse(x, y),
            ProjectionKind::TransverseMercator => self.tm_inverse(x, y),
        }
    }

    fn cone(&self) -> Cone {
        let a = self.ellipsoid.semi_major;
        let e2 = self.ellipsoid.eccentricity_squared();
        let e = e2.sqrt();
        let m = |phi: f64| phi.cos() / (1.0 - e2 * phi.sin().powi(2)).sqrt();
        let t = |phi: f64| {
            let es = e * phi.sin();
            (FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - es) / (1.0 + es)).powf(e / 2.0)
        };

        let phi0 = self.latitude_of_origin.to_radians();
        let phi1 = self.standard_parallels.0.to_radians();
        let phi2 = self.standard_parallels.1.to_radians();

        let n = if (phi1 - phi2).abs() < 1e-12 {
            phi1.sin()
        } else {
            (m(phi1).ln() - m(phi2).ln()) / (t(phi1).ln() - t(phi2).ln())
        };
        let af = a * self.scale_factor * m(phi1) / (n * t(phi1).powf(n));

        Cone {
            e,
            n,
            af,
            rho0: af * t(phi0).powf(n),
        }
    }

    fn lcc_inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let Cone { e, n, af, rho0 } = self.cone();
        let dy = rho0 - y;
        let sign = n.signum();
        let rho = sign * x.hypot(dy);
        let theta = (sign * x).atan2(sign * dy);
        let t = (rho / af).powf(1.0 / n);

        let mut phi = 2.0f64.mul_add(-t.atan(), FRAC_PI_2);
        for _ in 0..20 {
            let es = e * phi.sin();
            let next = 2.0f64.mul_add(
                -(t * ((1.0 - es) / (1.0 + es)).powf(e / 2.0)).atan(),
                FRAC_PI_2,
            );
            let done = (next - phi).abs() < 1e-12;
            phi = next;
            if done {
                break;
            }
        }

        let lambda = theta / n + self.central_meridian.to_radians();
        (lambda.to_degrees(), phi.to_degrees())
    }

    #[allow(clippy::many_single_char_names)]
    fn tm_inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let a = self.ellipsoid.semi_major;
        let e2 = self.ellipsoid.eccentricity_squared();
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let ep2 = e2 / (1.0 - e2);
        let k0 = self.scale_factor;

        let m = meridional_arc(a, e2, self.latitude_of_origin.to_radians()) + y / k0;
        let mu = m / (a * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));
        let root = (1.0 - e2).sqrt();
        let e1 = (1.0 - root) / (1.0 + root);

        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

        let (sin1, cos1) = phi1.sin_cos();
        let tan1 = phi1.tan();
        let c1 = ep2 * cos1 * cos1;
        let t1 = tan1 * tan1;
        let denom = 1.0 - e2 * sin1 * sin1;
        let n1 = a / denom.sqrt();
        let r1 = a * (1.0 - e2) / denom.powf(1.5);
        let d = x / (n1 * k0);

        let phi = phi1
            - (n1 * tan1 / r1)
                * (d * d / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d.powi(4) / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1
                        - 252.0 * ep2
                        - 3.0 * c1 * c1)
                        * d.powi(6)
                        / 720.0);
        let lambda = self.central_meridian.to_radians()
            + (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
                + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1)
                    * d.powi(5)
                    / 120.0)
                / cos1;

        (lambda.to_degrees(), phi.to_degrees())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// INEGI's national Lambert Conformal Conic, as shipped with the
    /// Marco Geoestadístico.
    pub const INEGI_LCC: &str = r#"PROJCS["MEXICO_ITRF_2008_LCC",GEOGCS["GCS_ITRF_2008",DATUM["D_ITRF_2008",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Lambert_Conformal_Conic"],PARAMETER["False_Easting",2500000.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",-102.0],PARAMETER["Standard_Parallel_1",17.5],PARAMETER["Standard_Parallel_2",29.5],PARAMETER["Latitude_Of_Origin",12.0],UNIT["Meter",1.0]]"#;

    const WGS84_GEOGRAPHIC: &str = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;

    fn utm(zone_meridian: f64, false_northing: f64) -> Projection {
        Projection {
            kind: ProjectionKind::TransverseMercator,
            ellipsoid: Ellipsoid::WGS84,
            latitude_of_origin: 0.0,
            central_meridian: zone_meridian,
            standard_parallels: (0.0, 0.0),
            scale_factor: 0.9996,
            false_easting: 500_000.0,
            false_northing,
            unit: 1.0,
        }
    }

    fn inegi() -> Projection {
        match parse_wkt(INEGI_LCC).unwrap() {
            Crs::Projected(p) => p,
            Crs::Geographic => panic!("expected a projected CRS"),
        }
    }

    /// Forward Lambert Conformal Conic, used to place test data.
    pub fn lcc_forward(projection: &Projection, longitude: f64, latitude: f64) -> (f64, f64) {
        let Cone { e, n, af, rho0 } = projection.cone();
        let phi = latitude.to_radians();
        let es = e * phi.sin();
        let t = (FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - es) / (1.0 + es)).powf(e / 2.0);
        let rho = af * t.powf(n);
        let theta = n * (longitude - projection.central_meridian).to_radians();
        (
            projection.false_easting + rho * theta.sin(),
            projection.false_northing + rho0 - rho * theta.cos(),
        )
    }

    pub fn inegi_forward(longitude: f64, latitude: f64) -> (f64, f64) {
        lcc_forward(&inegi(), longitude, latitude)
    }

    #[test]
    fn parses_inegi_lambert_parameters() {
        let p = inegi();
        assert_eq!(p.kind, ProjectionKind::LambertConformalConic);
        assert_eq!(p.ellipsoid, Ellipsoid::GRS80);
        assert!((p.central_meridian + 102.0).abs() < 1e-12);
        assert!((p.standard_parallels.0 - 17.5).abs() < 1e-12);
        assert!((p.standard_parallels.1 - 29.5).abs() < 1e-12);
        assert!((p.latitude_of_origin - 12.0).abs() < 1e-12);
        assert!((p.false_easting - 2_500_000.0).abs() < 1e-9);
        assert!((p.unit - 1.0).abs() < 1e-12);
    }

    #[test]
    fn geographic_wkt_needs_no_conversion() {
        let crs = parse_wkt(WGS84_GEOGRAPHIC).unwrap();
        assert_eq!(crs, Crs::Geographic);
        assert_eq!(crs.to_geographic(-89.6, 21.0), Coordinate::new(21.0, -89.6));
    }

    #[test]
    fn lambert_origin_maps_to_false_origin() {
        let (lon, lat) = inegi().inverse(2_500_000.0, 0.0);
        assert!((lon + 102.0).abs() < 1e-9);
        assert!((lat - 12.0).abs() < 1e-9);
    }

    #[test]
    fn lambert_central_meridian_keeps_false_easting() {
        let (x, _) = inegi_forward(-102.0, 20.0);
        assert!((x - 2_500_000.0).abs() < 1e-6);
    }

    #[test]
    fn lambert_inverts_merida() {
        let (x, y) = inegi_forward(-89.6237, 20.9674);
        assert!(x > 3_700_000.0 && x < 3_900_000.0, "easting {x}");
        assert!(y > 900_000.0 && y < 1_100_000.0, "northing {y}");

        let c = Crs::Projected(inegi()).to_geographic(x, y);
        assert!((c.latitude - 20.9674).abs() < 1e-8);
        assert!((c.longitude + 89.6237).abs() < 1e-8);
    }

    // Reference values from PROJ: EPSG:32630 (440298.94, 4474257.31) is
    // Madrid (-3.7037, 40.4168).
    #[test]
    fn utm_north_inverts_madrid() {
        let (lon, lat) = utm(-3.0, 0.0).inverse(440_298.94, 4_474_257.31);
        assert!((lon + 3.7037).abs() < 2e-5, "lon {lon}");
        assert!((lat - 40.4168).abs() < 2e-5, "lat {lat}");
    }

    // EPSG:32721 (373317.50, 6170036.17) is Buenos Aires (-58.3816, -34.6037).
    #[test]
    fn utm_south_inverts_buenos_aires() {
        let (lon, lat) = utm(-57.0, 10_000_000.0).inverse(373_317.50, 6_170_036.17);
        assert!((lon + 58.3816).abs() < 2e-5, "lon {lon}");
        assert!((lat + 34.6037).abs() < 2e-5, "lat {lat}");
    }

    #[test]
    fn parses_utm_wkt() {
        let wkt = r#"PROJCS["WGS_1984_UTM_Zone_16N",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],PARAMETER["False_Easting",500000.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",-87.0],PARAMETER["Scale_Factor",0.9996],PARAMETER["Latitude_Of_Origin",0.0],UNIT["Meter",1.0]]"#;
        let Crs::Projected(p) = parse_wkt(wkt).unwrap() else {
            panic!("expected a projected CRS");
        };
        assert_eq!(p.kind, ProjectionKind::TransverseMercator);
        assert_eq!(p.ellipsoid, Ellipsoid::WGS84);
        assert!((p.scale_factor - 0.9996).abs() < 1e-12);
        assert!((p.central_meridian + 87.0).abs() < 1e-12);
    }

    #[test]
    fn unsupported_projection_is_an_error() {
        let wkt = r#"PROJCS["WGS_1984_Web_Mercator_Auxiliary_Sphere",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]]],PROJECTION["Mercator_Auxiliary_Sphere"],UNIT["Meter",1.0]]"#;
        assert!(matches!(
            parse_wkt(wkt),
            Err(RegistryError::UnsupportedCrs { crs }) if crs == "mercator_auxiliary_sphere"
        ));
        assert!(parse_wkt("LOCAL_CS[\"grid\"]").is_err());
    }
}
