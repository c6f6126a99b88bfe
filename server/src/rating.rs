//! Elo rating updates for rated games.

pub const K_FACTOR: f64 = 32.0;

/// New ratings for both players after a game where `a` scored `score_a`
/// (1 win, 0.5 draw, 0 loss).
pub fn update_elo(rating_a: i32, rating_b: i32, score_a: f64) -> (i32, i32) {
    let expected_a = 1.0 / (1.0 + 10f64.powf(f64::from(rating_b - rating_a) / 400.0));
    let expected_b = 1.0 - expected_a;
    let score_b = 1.0 - score_a;

    let new_a = (f64::from(rating_a) + K_FACTOR * (score_a - expected_a)).round() as i32;
    let new_b = (f64::from(rating_b) + K_FACTOR * (score_b - expected_b)).round() as i32;
    (new_a, new_b)
}

/// White's score for a stored result code.
pub fn white_score(result: &str) -> f64 {
    if result.starts_with("1-0") {
        1.0
    } else if result.starts_with("1/2") {
        0.5
    } else {
        0.0
    }
}
