//! Rule-based recommendation scoring.
//!
//! A deterministic, additive sum of independent rule terms starting from a
//! base of 50, clamped to [0, 100]. The rule table is load-bearing for
//! behavioral parity with the deployed system; adjust weights only together
//! with the regression tests below.

use crate::types::{Car, ClientProfile, CreditHistory, Gender, ScoredCar};
use std::cmp::Ordering;

const BASE_SCORE: f64 = 50.0;

/// Score one catalog car against a client profile, in [0, 100].
///
/// Total over well-typed inputs: empty text attributes and absent feature
/// flags simply fail their conditions.
pub fn score(profile: &ClientProfile, car: &Car) -> f64 {
    let mut score = BASE_SCORE;
    let category = car.category.to_lowercase();

    // Age bands
    if profile.age < 25 {
        if car.has_feature("sporty") {
            score += 15.0;
        }
        if matches!(category.as_str(), "hatchback" | "coupe" | "convertible") {
            score += 10.0;
        }
        if car.price > 30_000.0 {
            score -= 10.0;
        }
    } else if profile.age < 40 {
        if car.has_feature("family_friendly") {
            score += 10.0;
        }
        if matches!(category.as_str(), "sedan" | "suv" | "crossover") {
            score += 10.0;
        }
    } else {
        if car.has_feature("luxury") {
            score += 15.0;
        }
        if car.has_feature("comfort") {
            score += 10.0;
        }
        if matches!(category.as_str(), "sedan" | "suv" | "luxury") {
            score += 10.0;
        }
    }

    match profile.gender {
        Gender::Male => {
            if car.has_feature("powerful") {
                score += 5.0;
            }
        }
        Gender::Female => {
            if car.has_feature("fuel_efficient") {
                score += 5.0;
            }
        }
    }

    // Family size
    if profile.family_members > 2 {
        if car.has_feature("family_friendly") {
            score += 15.0;
        }
        if matches!(category.as_str(), "suv" | "minivan" | "wagon") {
            score += 15.0;
        }
        if car.has_feature("spacious") {
            score += 10.0;
        }
    }

    // Job title
    let job = profile.job_title.to_lowercase();
    if job.contains("executive") || job.contains("manager") {
        if car.has_feature("luxury") {
            score += 10.0;
        }
        if car.has_feature("prestige") {
            score += 10.0;
        }
    }

    // Marital status
    if profile.marital_status.eq_ignore_ascii_case("married") {
        if car.has_feature("family_friendly") {
            score += 10.0;
        }
        if car.has_feature("safety") {
            score += 10.0;
        }
    }

    // Student status
    if profile.is_student {
        if car.has_feature("fuel_efficient") {
            score += 15.0;
        }
        if car.has_feature("affordable") {
            score += 15.0;
        }
        if car.price > 20_000.0 {
            score -= 15.0;
        }
    }

    // Ownership history
    if profile.has_car {
        if car.has_feature("upgrade") {
            score += 10.0;
        }
    } else if car.has_feature("entry_level") {
        score += 10.0;
    }

    // A missing credit history is penalized the same as a known-bad one.
    if profile.has_credit != CreditHistory::Yes && car.price > 30_000.0 {
        score -= 10.0;
    }

    score.clamp(0.0, 100.0)
}

/// Rank the catalog for a profile and return the top `min(k, |catalog|)`
/// cars, sorted descending by score with ties broken by ascending car id.
pub fn recommend(profile: &ClientProfile, catalog: &[Car], k: usize) -> Vec<ScoredCar> {
    let mut scored: Vec<ScoredCar> = catalog
        .iter()
        .map(|car| ScoredCar {
            score: score(profile, car),
            car: car.clone(),
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.car.id.cmp(&b.car.id))
    });
    scored.truncate(k);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn car(id: i64, category: &str, price: f64, features: &[&str]) -> Car {
        Car {
            id,
            name: format!("car-{id}"),
            brand: "Testa".into(),
            model: format!("T{id}"),
            price,
            year: 2023,
            category: category.into(),
            features: features.iter().map(|f| (f.to_string(), true)).collect(),
            image_url: None,
        }
    }

    fn profile(age: i32, gender: Gender) -> ClientProfile {
        ClientProfile {
            client_id: 1,
            age,
            gender,
            family_members: 0,
            marital_status: String::new(),
            job_title: String::new(),
            has_car: false,
            has_credit: CreditHistory::Unknown,
            is_student: false,
            budget: None,
        }
    }

    #[test]
    fn test_student_hatchback_clamps_at_100() {
        // 50 + 10 (hatchback) + 15 (student/fuel_efficient) + 15 (student/affordable)
        //    + 10 (entry_level) + 5 (female/fuel_efficient) = 105 -> 100
        let mut p = profile(22, Gender::Female);
        p.family_members = 1;
        p.is_student = true;
        let c = car(
            1,
            "hatchback",
            18_000.0,
            &["fuel_efficient", "affordable", "entry_level"],
        );
        assert_eq!(score(&p, &c), 100.0);
    }

    #[test]
    fn test_base_score_for_neutral_pair() {
        // No rule fires for a 30-year-old against a featureless coupe.
        let p = profile(30, Gender::Male);
        let c = car(1, "coupe", 25_000.0, &[]);
        assert_eq!(score(&p, &c), BASE_SCORE);
    }

    #[test]
    fn test_young_client_rules() {
        let p = profile(22, Gender::Male);
        // 50 + 15 (sporty) + 10 (coupe) - 10 (price > 30k) - 10 (no credit history) = 55
        let c = car(1, "Coupe", 35_000.0, &["sporty"]);
        assert_eq!(score(&p, &c), 55.0);
    }

    #[test]
    fn test_middle_age_band() {
        let p = profile(39, Gender::Male);
        // 50 + 10 (family_friendly) + 10 (suv) = 70
        let c = car(1, "SUV", 28_000.0, &["family_friendly"]);
        assert_eq!(score(&p, &c), 70.0);

        // Age 40 falls into the senior band instead.
        let p40 = profile(40, Gender::Male);
        // 50 + 10 (suv category in senior band) = 60
        assert_eq!(score(&p40, &c), 60.0);
    }

    #[test]
    fn test_senior_luxury_rules() {
        let mut p = profile(55, Gender::Male);
        p.has_credit = CreditHistory::Yes;
        // 50 + 15 (luxury) + 10 (comfort) + 10 (sedan) + 5 (male/powerful) = 90
        let c = car(1, "sedan", 60_000.0, &["luxury", "comfort", "powerful"]);
        assert_eq!(score(&p, &c), 90.0);
    }

    #[test]
    fn test_large_family_rules() {
        let mut p = profile(35, Gender::Female);
        p.family_members = 4;
        // 50 + 10 (family_friendly, mid band) + 15 (family/family_friendly)
        //    + 15 (minivan) + 10 (spacious) = 100
        let c = car(1, "minivan", 30_000.0, &["family_friendly", "spacious"]);
        assert_eq!(score(&p, &c), 100.0);
    }

    #[test]
    fn test_job_title_substring_case_insensitive() {
        let mut p = profile(45, Gender::Male);
        p.job_title = "Senior Sales MANAGER".into();
        p.has_credit = CreditHistory::Yes;
        // 50 + 15 (luxury, senior band) + 10 (job/luxury) + 10 (job/prestige) = 85
        let c = car(1, "coupe", 80_000.0, &["luxury", "prestige"]);
        assert_eq!(score(&p, &c), 85.0);
    }

    #[test]
    fn test_empty_text_attributes_never_fire() {
        let p = profile(30, Gender::Male);
        assert!(p.job_title.is_empty() && p.marital_status.is_empty());
        let c = car(1, "coupe", 10_000.0, &["luxury", "prestige", "safety"]);
        // None of the job or marital rules may fire.
        assert_eq!(score(&p, &c), BASE_SCORE);
    }

    #[test]
    fn test_married_rules() {
        let mut p = profile(30, Gender::Male);
        p.marital_status = "Married".into();
        // 50 + 10 (family_friendly, mid band) + 10 (married/family_friendly)
        //    + 10 (married/safety) = 80
        let c = car(1, "wagon", 22_000.0, &["family_friendly", "safety"]);
        assert_eq!(score(&p, &c), 80.0);
    }

    #[test]
    fn test_credit_unknown_penalized_like_no() {
        let base = car(1, "coupe", 45_000.0, &[]);
        let mut p = profile(30, Gender::Male);

        p.has_credit = CreditHistory::Unknown;
        let unknown = score(&p, &base);
        p.has_credit = CreditHistory::No;
        let no = score(&p, &base);
        p.has_credit = CreditHistory::Yes;
        let yes = score(&p, &base);

        assert_eq!(unknown, no);
        assert_eq!(yes, no + 10.0);
    }

    #[test]
    fn test_ownership_rules_are_exclusive() {
        let c = car(1, "coupe", 15_000.0, &["upgrade", "entry_level"]);
        let mut p = profile(30, Gender::Male);

        p.has_car = true;
        assert_eq!(score(&p, &c), 60.0); // upgrade only
        p.has_car = false;
        assert_eq!(score(&p, &c), 60.0); // entry_level only
    }

    #[test]
    fn test_score_always_in_range() {
        let profiles = [
            profile(18, Gender::Female),
            profile(30, Gender::Male),
            profile(70, Gender::Female),
            {
                let mut p = profile(22, Gender::Male);
                p.is_student = true;
                p
            },
        ];
        let cars = [
            car(1, "hatchback", 5_000.0, &["sporty", "affordable", "fuel_efficient"]),
            car(2, "luxury", 250_000.0, &["luxury", "prestige", "comfort", "powerful"]),
            car(3, "", 0.0, &[]),
        ];
        for p in &profiles {
            for c in &cars {
                let s = score(p, c);
                assert!((0.0..=100.0).contains(&s), "score {s} out of range");
            }
        }
    }

    #[test]
    fn test_recommend_orders_and_truncates() {
        let p = profile(22, Gender::Female);
        let catalog = vec![
            car(1, "sedan", 50_000.0, &[]),
            car(2, "hatchback", 15_000.0, &["sporty"]),
            car(3, "coupe", 18_000.0, &[]),
        ];

        let top = recommend(&p, &catalog, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].car.id, 2);
        assert_eq!(top[1].car.id, 3);
        assert!(top[0].score >= top[1].score);

        // k larger than the catalog returns everything.
        let all = recommend(&p, &catalog, 10);
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_recommend_tie_breaks_by_ascending_id() {
        let p = profile(30, Gender::Male);
        // Identical cars, identical scores: ascending id order.
        let catalog = vec![
            car(9, "coupe", 25_000.0, &[]),
            car(4, "coupe", 25_000.0, &[]),
            car(7, "coupe", 25_000.0, &[]),
        ];
        let ranked = recommend(&p, &catalog, 3);
        let ids: Vec<i64> = ranked.iter().map(|s| s.car.id).collect();
        assert_eq!(ids, vec![4, 7, 9]);
    }

    #[test]
    fn test_recommend_empty_catalog() {
        let p = profile(30, Gender::Male);
        assert!(recommend(&p, &[], 5).is_empty());
    }

    #[test]
    fn test_recommend_deterministic() {
        let p = profile(28, Gender::Female);
        let catalog: Vec<Car> = (0..20)
            .map(|i| {
                let mut features = BTreeMap::new();
                features.insert("fuel_efficient".to_string(), i % 2 == 0);
                features.insert("family_friendly".to_string(), i % 3 == 0);
                Car {
                    features,
                    ..car(i, "sedan", 10_000.0 + 1_000.0 * i as f64, &[])
                }
            })
            .collect();

        let first = recommend(&p, &catalog, 5);
        let second = recommend(&p, &catalog, 5);
        let ids = |v: &[ScoredCar]| v.iter().map(|s| s.car.id).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
    }
}
