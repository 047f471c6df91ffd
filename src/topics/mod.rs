// Topic vectors: sparse arithmetic, theme fingerprints and affinity scoring.

pub mod vector;
pub mod fingerprint;
pub mod affinity;
