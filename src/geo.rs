//! City centroid lookup used to place listings that arrive without coordinates.

use rand::Rng;

/// Per-axis jitter for known cities, roughly a third of a mile.
pub const CITY_JITTER_DEGREES: f64 = 0.005;
/// Per-axis jitter around the regional center for unknown cities.
pub const REGION_JITTER_DEGREES: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

pub const ARIZONA_CENTER: Coordinates = Coordinates::new(34.0489, -111.0937);

const CITY_COORDINATES: &[(&str, Coordinates)] = &[
    ("Phoenix", Coordinates::new(33.4484, -112.0740)),
    ("Tucson", Coordinates::new(32.2226, -110.9747)),
    ("Mesa", Coordinates::new(33.4152, -111.8315)),
    ("Chandler", Coordinates::new(33.3062, -111.8413)),
    ("Scottsdale", Coordinates::new(33.4942, -111.9261)),
    ("Glendale", Coordinates::new(33.5387, -112.1860)),
    ("Gilbert", Coordinates::new(33.3528, -111.7890)),
    ("Tempe", Coordinates::new(33.4255, -111.9400)),
    ("Peoria", Coordinates::new(33.5806, -112.2374)),
    ("Surprise", Coordinates::new(33.6292, -112.3680)),
    ("Flagstaff", Coordinates::new(35.1983, -111.6513)),
    ("Sedona", Coordinates::new(34.8697, -111.7610)),
];

/// Known centroid for `city`, matched case-insensitively.
pub fn city_centroid(city: &str) -> Option<Coordinates> {
    let city = city.trim();
    CITY_COORDINATES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(city))
        .map(|(_, coords)| *coords)
}

/// Caller coordinates win when both are present; otherwise the city centroid
/// (or the regional center) is offset by a bounded random jitter so markers
/// in the same city do not stack.
pub fn resolve_coordinates<R: Rng + ?Sized>(
    city: &str,
    latitude: Option<f64>,
    longitude: Option<f64>,
    rng: &mut R,
) -> Coordinates {
    if let (Some(latitude), Some(longitude)) = (latitude, longitude) {
        return Coordinates::new(latitude, longitude);
    }

    match city_centroid(city) {
        Some(center) => jitter(center, CITY_JITTER_DEGREES, rng),
        None => jitter(ARIZONA_CENTER, REGION_JITTER_DEGREES, rng),
    }
}

fn jitter<R: Rng + ?Sized>(center: Coordinates, radius: f64, rng: &mut R) -> Coordinates {
    Coordinates::new(
        center.latitude + rng.gen_range(-radius..=radius),
        center.longitude + rng.gen_range(-radius..=radius),
    )
}
