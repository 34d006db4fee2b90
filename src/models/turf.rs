use serde::{Deserialize, Serialize};

pub const CITIES: [&str; 10] = [
    "Mumbai",
    "Delhi",
    "Bengaluru",
    "Hyderabad",
    "Chennai",
    "Kolkata",
    "Ahmedabad",
    "Pune",
    "Jaipur",
    "Lucknow",
];

pub const SPORTS: [&str; 6] = [
    "Cricket",
    "Football",
    "Badminton",
    "Volleyball",
    "Basketball",
    "Tennis",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turf {
    pub id: String,
    pub name: String,
    pub location: String,
    pub address: String,
    pub sport: String,
    /// Price for one hour slot.
    pub price: f64,
    pub description: Option<String>,
    pub owner_id: String,
}

impl Turf {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !CITIES.contains(&self.location.as_str()) {
            anyhow::bail!("unknown city: {}", self.location);
        }
        if !SPORTS.contains(&self.sport.as_str()) {
            anyhow::bail!("unknown sport: {}", self.sport);
        }
        if self.price <= 0.0 {
            anyhow::bail!("price must be positive");
        }
        Ok(())
    }
}
