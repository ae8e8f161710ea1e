//! Brand profiles.
//!
//! The site is rebranded by swapping copy, not structure: every preset fills
//! the same [`Brand`] shape that the page templates render.

use serde::{Deserialize, Serialize};

use crate::config::SiteConfig;

/// Built-in brand presets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BrandPreset {
    #[default]
    Caret,
    Sriracha,
}

/// A service offered on the landing page
#[derive(Debug, Clone)]
pub struct Service {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
}

/// A portfolio entry
#[derive(Debug, Clone)]
pub struct Project {
    pub title: String,
    pub category: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct Faq {
    pub question: String,
    pub answer: String,
}

/// All copy the public pages need.
#[derive(Debug, Clone)]
pub struct Brand {
    pub name: String,
    pub tagline: String,
    pub description: String,
    pub site_url: String,
    pub contact_email: String,
    pub social_handle: String,
    pub services: Vec<Service>,
    pub projects: Vec<Project>,
    pub faqs: Vec<Faq>,
}

impl Brand {
    /// Resolve the configured preset and apply field overrides.
    pub fn from_config(site: &SiteConfig) -> Self {
        let mut brand = Self::preset(site.brand);

        if let Some(name) = &site.name {
            brand.name = name.clone();
        }
        if let Some(tagline) = &site.tagline {
            brand.tagline = tagline.clone();
        }
        if let Some(description) = &site.description {
            brand.description = description.clone();
        }
        if let Some(site_url) = &site.site_url {
            brand.site_url = site_url.clone();
        }
        if let Some(contact_email) = &site.contact_email {
            brand.contact_email = contact_email.clone();
        }
        if let Some(social_handle) = &site.social_handle {
            brand.social_handle = social_handle.clone();
        }

        brand
    }

    pub fn preset(preset: BrandPreset) -> Self {
        match preset {
            BrandPreset::Caret => Self {
                name: "Caret Design".to_string(),
                tagline: "Websites that make people say WAHT!".to_string(),
                description: "Caret Design is a student-founded studio crafting websites, \
                              brands and digital products with care for every detail."
                    .to_string(),
                site_url: "https://caretdesign.co".to_string(),
                contact_email: "hello@caretdesign.co".to_string(),
                social_handle: "@caretdesign".to_string(),
                services: common_services(),
                projects: common_projects(),
                faqs: common_faqs(),
            },
            BrandPreset::Sriracha => Self {
                name: "Sriracha Creative".to_string(),
                tagline: "Websites too hot to handle.".to_string(),
                description: "Sriracha Creative builds websites too hot to handle. Our \
                              student-founded agency specializes in web design, development, \
                              branding, and creative digital solutions."
                    .to_string(),
                site_url: "https://srirachacreative.com".to_string(),
                contact_email: "hello@srirachacreative.com".to_string(),
                social_handle: "@srirachacreative".to_string(),
                services: common_services(),
                projects: common_projects(),
                faqs: common_faqs(),
            },
        }
    }

    /// Absolute URL for a site path, used in canonical/OG tags.
    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.site_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn service(title: &str, description: &str, tags: &[&str]) -> Service {
    Service {
        title: title.to_string(),
        description: description.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

fn common_services() -> Vec<Service> {
    vec![
        service(
            "Web Design",
            "Beautiful, functional websites that capture your brand's essence and engage your audience.",
            &["UI/UX", "Responsive", "Prototyping"],
        ),
        service(
            "Development",
            "High-performance web applications built with modern technologies and best practices.",
            &["Frontend", "Backend", "CMS"],
        ),
        service(
            "Branding",
            "Distinctive brand identities that tell your story and connect with your audience.",
            &["Logo", "Identity", "Guidelines"],
        ),
        service(
            "SEO & Growth",
            "Data-driven strategies to increase visibility and drive meaningful results.",
            &["SEO", "Analytics", "Performance"],
        ),
    ]
}

fn project(title: &str, category: &str, description: &str) -> Project {
    Project {
        title: title.to_string(),
        category: category.to_string(),
        description: description.to_string(),
    }
}

fn common_projects() -> Vec<Project> {
    vec![
        project(
            "Digital Commerce Platform",
            "E-Commerce",
            "A modern e-commerce experience with seamless checkout and inventory management.",
        ),
        project(
            "FinTech Dashboard",
            "Finance",
            "Real-time analytics and portfolio management for modern investors.",
        ),
        project(
            "Healthcare Portal",
            "Healthcare",
            "Patient-centered telemedicine platform with appointment scheduling and records.",
        ),
        project(
            "Restaurant Booking App",
            "Hospitality",
            "Streamlined reservations and table management for dining establishments.",
        ),
    ]
}

fn faq(question: &str, answer: &str) -> Faq {
    Faq {
        question: question.to_string(),
        answer: answer.to_string(),
    }
}

fn common_faqs() -> Vec<Faq> {
    vec![
        faq(
            "What services do you offer?",
            "We specialize in web design, development, branding, SEO, and digital solutions for businesses worldwide.",
        ),
        faq(
            "How long does it take to build a website?",
            "Most projects take about 2 weeks for a standard website, but can range up to 6 weeks for complex builds or custom features.",
        ),
        faq(
            "How much does a website cost?",
            "Most projects start at $2,000 for a standard business website. We provide transparent, fixed quotes after a free consultation.",
        ),
        faq(
            "What is your process?",
            "Discovery, strategy, design, development, testing, and launch. We keep you involved at every step for feedback and approvals.",
        ),
        faq(
            "How many revisions do I get?",
            "At least two rounds of revisions at each major stage (design and development).",
        ),
        faq(
            "Do you offer support after launch?",
            "Yes! We offer ongoing support, maintenance, and updates to keep your website running smoothly.",
        ),
        faq(
            "How do we get started?",
            "Just contact us through the form or email, and we'll schedule a free consultation to discuss your project.",
        ),
    ]
}
