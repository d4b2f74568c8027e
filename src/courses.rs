use serde::{Deserialize, Serialize};

use crate::geo::{nearest_k, Anchored, GeoPoint};

/// A published walking course, anchored at its starting point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub name: String,
    pub region: String,
    pub anchor: GeoPoint,
}

impl Course {
    fn new(id: &str, name: &str, region: &str, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            region: region.to_string(),
            anchor: GeoPoint {
                latitude,
                longitude,
            },
        }
    }
}

impl Anchored for Course {
    fn anchor(&self) -> GeoPoint {
        self.anchor
    }
}

pub fn builtin_courses() -> Vec<Course> {
    vec![
        Course::new("gyeongbokgung", "Gyeongbokgung Palace Loop", "Seoul", 37.5788, 126.9770),
        Course::new("cheonggyecheon", "Cheonggyecheon Stream", "Seoul", 37.5692, 126.9784),
        Course::new("namsan", "Namsan Tower Trail", "Seoul", 37.5512, 126.9882),
        Course::new("bukchon", "Bukchon Hanok Alleys", "Seoul", 37.5826, 126.9830),
        Course::new("yeouido", "Yeouido Hangang Park", "Seoul", 37.5284, 126.9327),
        Course::new("wolmido", "Wolmido Seaside", "Incheon", 37.4754, 126.5975),
        Course::new("hwaseong", "Hwaseong Fortress Wall", "Suwon", 37.2871, 127.0119),
        Course::new("haeundae", "Haeundae Dalmaji Road", "Busan", 35.1587, 129.1604),
        Course::new("gamcheon", "Gamcheon Culture Village", "Busan", 35.0975, 129.0106),
        Course::new("jeonju", "Jeonju Hanok Village", "Jeonju", 35.8150, 127.1530),
    ]
}

/// Courses nearest to `origin`, closest first, with their distance in meters.
pub fn nearby(origin: GeoPoint, courses: &[Course], k: usize) -> Vec<(&Course, f64)> {
    nearest_k(origin, courses, k as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_anchors_are_valid() {
        let courses = builtin_courses();
        assert!(courses.iter().all(|c| c.anchor.is_valid()));
        let mut ids: Vec<_> = courses.iter().map(|c| c.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), courses.len());
    }

    #[test]
    fn test_nearby_from_city_hall() {
        let courses = builtin_courses();
        let city_hall = GeoPoint::new(37.5663, 126.9779).unwrap();
        let near = nearby(city_hall, &courses, 3);

        assert_eq!(near.len(), 3);
        assert_eq!(near[0].0.id, "cheonggyecheon");
        assert!(near.iter().all(|(c, _)| c.region == "Seoul"));
    }
}
