// Cache de cidades próximas por campus (chave: escola em minúsculas).
// Só o raio padrão é guardado, então o cache tem no máximo uma entrada por escola.
use std::collections::HashMap;
use std::sync::RwLock;

use crate::models::NearbyCity;

lazy_static::lazy_static! {
    static ref NEARBY_CACHE: RwLock<HashMap<String, Vec<NearbyCity>>> = RwLock::new(HashMap::new());
}

fn cache_key(school: &str) -> String {
    school.trim().to_lowercase()
}

pub fn get_cached_nearby(school: &str) -> Option<Vec<NearbyCity>> {
    NEARBY_CACHE.read().ok()?.get(&cache_key(school)).cloned()
}

pub fn set_cached_nearby(school: &str, cities: Vec<NearbyCity>) {
    if let Ok(mut cache) = NEARBY_CACHE.write() {
        cache.insert(cache_key(school), cities);
    }
}
