//! Fixed lookup tables shared by every session: rating markers and the two
//! label vocabularies offered in the select menus.

use uuid::Uuid;

/// Rating markers in attachment order; position + 1 is the mood level.
pub const RATING_MARKERS: [&str; 5] = [
    "1\u{fe0f}\u{20e3}",
    "2\u{fe0f}\u{20e3}",
    "3\u{fe0f}\u{20e3}",
    "4\u{fe0f}\u{20e3}",
    "5\u{fe0f}\u{20e3}",
];

pub const EMOTIONS: [&str; 22] = [
    "antusias",
    "gembira",
    "takjub",
    "semangat",
    "bangga",
    "penuh cinta",
    "santai",
    "tenang",
    "puas",
    "marah",
    "takut",
    "stress",
    "waspada",
    "kesal",
    "malu",
    "cemas",
    "lesu",
    "sedih",
    "duka",
    "bosan",
    "kesepian",
    "bingung",
];

pub const EMOTION_SOURCES: [&str; 17] = [
    "keluarga",
    "pekerjaan",
    "teman",
    "percintaan",
    "kesehatan",
    "pendidikan",
    "tidur",
    "perjalanan",
    "bersantai",
    "makanan",
    "olahraga",
    "hobi",
    "cuaca",
    "belanja",
    "hiburan",
    "keuangan",
    "ibadah",
];

pub fn mood_level(marker: &str) -> Option<i32> {
    RATING_MARKERS
        .iter()
        .position(|candidate| *candidate == marker)
        .map(|index| index as i32 + 1)
}

pub fn marker_for(level: i32) -> Option<&'static str> {
    usize::try_from(level - 1)
        .ok()
        .and_then(|index| RATING_MARKERS.get(index).copied())
}

/// Returns every item exactly once in a fresh random order.
pub fn shuffle<T: Clone>(items: &[T]) -> Vec<T> {
    let bits = Uuid::new_v4().as_u128();
    shuffle_with_seed(items, (bits >> 64) as u64 ^ bits as u64)
}

/// Fisher-Yates driven by xorshift64*; the same seed gives the same order.
pub fn shuffle_with_seed<T: Clone>(items: &[T], seed: u64) -> Vec<T> {
    let mut state = if seed == 0 { 0x9e37_79b9_7f4a_7c15 } else { seed };
    let mut next = move || {
        state ^= state >> 12;
        state ^= state << 25;
        state ^= state >> 27;
        state.wrapping_mul(0x2545_f491_4f6c_dd1d)
    };

    let mut shuffled = items.to_vec();
    for i in (1..shuffled.len()).rev() {
        let j = (next() % (i as u64 + 1)) as usize;
        shuffled.swap(i, j);
    }
    shuffled
}

/// Joins labels as "a, b dan c".
pub fn alternate_join<S: AsRef<str>>(labels: &[S]) -> String {
    match labels {
        [] => String::new(),
        [only] => only.as_ref().to_string(),
        [head @ .., last] => {
            let head: Vec<&str> = head.iter().map(|label| label.as_ref()).collect();
            format!("{} dan {}", head.join(", "), last.as_ref())
        }
    }
}
