/// Fetch target for one brand in a single run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandQuota {
    pub brand: String,
    pub quota: usize,
}

/// Split `max` evenly across `brands`; the first `max % n` brands get one extra.
pub fn split_quota(max: usize, brands: &[String]) -> Vec<BrandQuota> {
    if brands.is_empty() {
        return Vec::new();
    }
    let base = max / brands.len();
    let remainder = max % brands.len();
    brands
        .iter()
        .enumerate()
        .map(|(i, brand)| BrandQuota {
            brand: brand.clone(),
            quota: base + usize::from(i < remainder),
        })
        .collect()
}
