use crate::models::performance::{Grade, SeverityTier};

/// Letter grade of a percentage. Each tier includes its lower bound.
pub fn grade_of(percentage: f64) -> Grade {
    if percentage >= 95.0 {
        Grade::APlus
    } else if percentage >= 90.0 {
        Grade::A
    } else if percentage >= 85.0 {
        Grade::BPlus
    } else if percentage >= 80.0 {
        Grade::B
    } else {
        Grade::C
    }
}

pub fn tier_of(percentage: f64) -> SeverityTier {
    if percentage >= 95.0 {
        SeverityTier::Excellent
    } else if percentage >= 85.0 {
        SeverityTier::Good
    } else if percentage >= 75.0 {
        SeverityTier::Fair
    } else {
        SeverityTier::Poor
    }
}
