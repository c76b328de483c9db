use super::protein::TransportProtein;

/// One of the fixed membrane positions that can hold a single transport
/// protein. The x position never changes after construction.
#[derive(serde::Serialize, serde::Deserialize, Clone)]
pub struct Slot {
    pub x: f64,
    pub protein: Option<TransportProtein>,
}

impl Slot {
    pub fn new(x: f64) -> Self {
        Slot { x, protein: None }
    }
}
