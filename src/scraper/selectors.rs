use crate::domain::Platform;

/// Landmarks of a single-product page.
#[derive(Debug)]
pub struct DetailSelectors {
    /// Presence of this element selects detail mode
    pub landmark: &'static str,
    pub title: &'static str,
    pub price: &'static str,
    pub description_items: &'static str,
    pub main_image: &'static str,
    pub thumbnails: &'static str,
    pub meta_rows: &'static str,
    pub meta_key: &'static str,
    pub meta_value: &'static str,
}

/// Repeated cards of a search/listing page.
#[derive(Debug)]
pub struct ListingSelectors {
    pub card: &'static str,
    pub title: &'static str,
    pub price: &'static str,
    pub image: &'static str,
    pub link: &'static str,
}

#[derive(Debug)]
pub struct PlatformSelectors {
    pub detail: Option<DetailSelectors>,
    pub listing: ListingSelectors,
}

static AMAZON: PlatformSelectors = PlatformSelectors {
    detail: Some(DetailSelectors {
        landmark: "#productTitle",
        title: "#productTitle",
        price: "#corePrice_feature_div .a-offscreen",
        description_items: "#feature-bullets .a-list-item",
        main_image: "#imgTagWrapperId img, img#landingImage",
        thumbnails: "#altImages .a-button-thumbnail img, #altImages img",
        meta_rows: "#productDetails_detailBullets_sections1 tr, #detailBullets_feature_div li",
        meta_key: "th, .a-text-bold",
        meta_value: "td, .a-list-item > span:last-child",
    }),
    listing: ListingSelectors {
        card: "div[data-component-type=\"s-search-result\"]",
        title: "h2 a span, h2 span",
        price: ".a-price .a-offscreen",
        image: "img.s-image",
        link: "h2 a, a.a-link-normal",
    },
};

static FLIPKART: PlatformSelectors = PlatformSelectors {
    detail: None,
    listing: ListingSelectors {
        card: "div._2kHMtA, div._1AtVbE",
        title: "a.s1Q9rs, a.IRpwTa",
        price: "div._30jeq3",
        image: "img._396cs4",
        link: "a.s1Q9rs, a.IRpwTa",
    },
};

static ZEPTO: PlatformSelectors = PlatformSelectors {
    detail: None,
    listing: ListingSelectors {
        card: "div.product-card",
        title: "h2 a span",
        price: ".a-price .a-offscreen",
        image: "img.s-image",
        link: "h2 a",
    },
};

impl PlatformSelectors {
    pub fn for_platform(platform: Platform) -> &'static PlatformSelectors {
        match platform {
            Platform::Amazon => &AMAZON,
            Platform::Flipkart => &FLIPKART,
            Platform::Zepto => &ZEPTO,
        }
    }
}
