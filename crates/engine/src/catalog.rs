//! Static reference data read by the workflows.
//!
//! Everything here is already resolved and read-only: the engine never
//! fetches or mutates these sequences.

pub const LOCATIONS: &[&str] = &[
    "Desa Sukajaya",
    "Desa Makmur",
    "Desa Cibaduyut",
    "Desa Karanganyar",
];

pub const COMMODITIES: &[&str] = &["Padi", "Jagung", "Cabai", "Kopi"];

pub const FARMING_PROBLEMS: &[&str] = &[
    "Harga Jatuh",
    "Hama & Penyakit",
    "Modal Tanam",
    "Cuaca Ekstrem",
    "Pupuk Mahal",
];

pub const FEATURES: &[&str] = &["Modal", "Kontrak", "Pakar"];

pub const LOAN_PURPOSES: &[&str] = &["Pupuk", "Benih", "Alsintan"];

pub const LOAN_MIN: i64 = 500_000;
pub const LOAN_MAX: i64 = 10_000_000;
pub const LOAN_STEP: i64 = 100_000;

pub const CREDIT_SCORE: u16 = 850;

pub const ADVISOR_GREETING: &str = "Halo, saya Agro-AI. Asisten agronomi berlisensi Anda. \
     Ada gejala hama atau kebutuhan konsultasi pupuk apa hari ini?";

pub const ADVISOR_REPLIES: &[&str] = &[
    "Berdasarkan database penyakit tanaman padi 2024, gejala daun menguning di ujung \
     mengindikasikan kekurangan Kalium (K). Saran: Aplikasikan pupuk KCl dosis 50kg/ha.",
    "Untuk tanah gambut dengan pH 4.5, saya merekomendasikan pengapuran (Dolomit) minimal \
     2 minggu sebelum tanam untuk menetralkan keasaman.",
    "Cuaca ekstrem diprediksi terjadi 3 hari ke depan. Sebaiknya tunda penyemprotan \
     pestisida agar tidak tercuci air hujan.",
];

/// `(health %, issue, recommendation)` candidates for a crop scan.
pub const DIAGNOSES: &[(u8, &str, &str)] = &[
    (
        85,
        "Kekurangan Nitrogen Ringan",
        "Tambahkan Urea 5kg/ha segera.",
    ),
    (
        92,
        "Tanaman Sehat",
        "Lanjutkan jadwal pemupukan seperti biasa.",
    ),
    (
        64,
        "Gejala Hawar Daun Bakteri",
        "Kurangi genangan air dan semprot bakterisida berbahan tembaga.",
    ),
];

pub fn is_location(value: &str) -> bool {
    LOCATIONS.contains(&value)
}
