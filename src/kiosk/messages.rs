use rand::Rng;

/// Thank-you lines shown after a successful submit.
pub const MESSAGES: [&str; 10] = [
    "You make SBER shine brighter!",
    "The camera loves you!",
    "That smile says success!",
    "Total SBER star energy!",
    "You just lit up the screen!",
    "Your energy defines success!",
    "SBER grows stronger with you!",
    "You inspire excellence every day!",
    "You're a true part of SBER's story!",
    "Your presence means a lot to us!",
];

pub fn pick<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    MESSAGES[rng.random_range(0..MESSAGES.len())]
}

pub fn random() -> &'static str {
    pick(&mut rand::rng())
}
