use crate::models::{Language, LocalizedContent, Product, ProductCard, EMPTY_CONTENT};

/**
 * display_content
 * Content shown for `product` when the list is viewed in `lang`: the
 * selected translation, else English (which also covers legacy root fields).
 */
pub fn display_content(product: &Product, lang: Language) -> &LocalizedContent {
    product
        .translation(lang)
        .or_else(|| product.translation(Language::En))
        .unwrap_or(&EMPTY_CONTENT)
}

/**
 * is_missing_translation
 * True when a non-English view falls back to English for `product`.
 */
pub fn is_missing_translation(product: &Product, lang: Language) -> bool {
    lang != Language::En && !product.has_translation(lang)
}

/**
 * matches_search
 * Case-insensitive substring match on title or subtitle; `needle` is
 * already lowercased and trimmed.
 */
fn matches_search(content: &LocalizedContent, needle: &str) -> bool {
    needle.is_empty()
        || content.title.to_lowercase().contains(needle)
        || content.subtitle.to_lowercase().contains(needle)
}

/// Product collection as last fetched from the catalog API.
#[derive(Debug, Default)]
pub struct ListView {
    products: Vec<Product>,
    loaded: bool,
}

impl ListView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn replace(&mut self, products: Vec<Product>) {
        self.products = products;
        self.loaded = true;
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn find(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Drops `id` from the local list. Only called once the API has
    /// acknowledged the delete.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.products.len();
        self.products.retain(|p| p.id != id);
        self.products.len() != before
    }

    pub fn cards(&self, lang: Language, search: &str) -> Vec<ProductCard> {
        let needle = search.trim().to_lowercase();
        self.products
            .iter()
            .filter_map(|product| {
                let content = display_content(product, lang);
                if !matches_search(content, &needle) {
                    return None;
                }
                Some(ProductCard {
                    id: product.id.clone(),
                    image_url: product.image_url.clone(),
                    title: content.title.clone(),
                    subtitle: content.subtitle.clone(),
                    description: content.description.clone(),
                    pack_size_count: product.pack_sizes.len(),
                    missing_translation: is_missing_translation(product, lang),
                })
            })
            .collect()
    }
}
