//! Animation timelines for the landing page sections.
//!
//! Targets are the `data-anim` names the landing template puts on elements.
//! Repeated elements use `<prefix>-<index>`.

use crate::site::brand::Brand;
use crate::site::timeline::{Easing, Property, Timeline, Track, Trigger};

/// Enter once the element is 100px inside the viewport
const IN_VIEW_ONCE: Trigger = Trigger::InView {
    margin_px: -100.0,
    once: true,
};

pub fn target(prefix: &str, index: usize) -> String {
    format!("{prefix}-{index}")
}

/// Fade-and-rise used by most section content
fn rise(target: String, distance: f64, trigger: Trigger) -> [Track; 2] {
    [
        Track::new(target.clone(), Property::Opacity, vec![0.0, 1.0]).trigger(trigger),
        Track::new(target, Property::TranslateY, vec![distance, 0.0]).trigger(trigger),
    ]
}

fn with_tracks(mut timeline: Timeline, tracks: impl IntoIterator<Item = Track>) -> Timeline {
    timeline.tracks.extend(tracks);
    timeline
}

/// Hero headline: words slide up out of a mask, staggered on load.
fn hero(words: usize) -> Timeline {
    let lines = (0..words).map(|i| {
        Track::new(target("hero-word", i), Property::TranslateY, vec![110.0, 0.0])
            .duration(900.0)
            .delay(200.0)
    });
    let timeline = with_tracks(Timeline::new("hero").stagger(60.0), lines);

    with_tracks(
        timeline,
        [
            Track::new("hero-tagline", Property::Opacity, vec![0.0, 1.0]).delay(700.0),
            Track::new("hero-cta", Property::Scale, vec![0.9, 1.0])
                .delay(900.0)
                .easing(Easing::Spring {
                    stiffness: 260.0,
                    damping: 20.0,
                    mass: 1.0,
                }),
        ],
    )
}

/// Service cards rise in one after another as the grid scrolls into view.
fn services(count: usize) -> Timeline {
    let cards = (0..count).flat_map(|i| rise(target("service", i), 60.0, IN_VIEW_ONCE));
    with_tracks(Timeline::new("services").stagger(75.0), cards)
}

/// Project cards scale up while scrolling past and fade slightly on the way out.
fn projects(count: usize) -> Timeline {
    let header = rise("projects-header".to_string(), 40.0, IN_VIEW_ONCE);
    let cards = (0..count).flat_map(|i| {
        let scroll = Trigger::ScrollLinked { start: 0.0, end: 1.0 };
        [
            Track::new(target("project", i), Property::Scale, vec![0.9, 1.0, 1.0, 0.95])
                .trigger(scroll)
                .easing(Easing::Linear),
            Track::new(target("project", i), Property::Opacity, vec![0.0, 1.0, 1.0, 0.8])
                .trigger(scroll)
                .easing(Easing::Linear),
        ]
    });
    with_tracks(Timeline::new("projects"), header.into_iter().chain(cards))
}

/// About block: the image is revealed with a clip wipe, then drifts on scroll.
fn about() -> Timeline {
    let reveal = Track::new("about-image", Property::ClipInset, vec![100.0, 0.0])
        .trigger(IN_VIEW_ONCE)
        .duration(1200.0);
    let drift = Track::new("about-image", Property::TranslateY, vec![40.0, -40.0])
        .trigger(Trigger::ScrollLinked { start: 0.0, end: 1.0 })
        .easing(Easing::Linear);
    let copy = rise("about-copy".to_string(), 30.0, IN_VIEW_ONCE);

    with_tracks(Timeline::new("about"), [reveal, drift].into_iter().chain(copy))
}

/// FAQ items fade up with a short stagger.
fn faq(count: usize) -> Timeline {
    let items = (0..count).flat_map(|i| {
        rise(target("faq", i), 20.0, IN_VIEW_ONCE).map(|t| t.duration(500.0))
    });
    with_tracks(Timeline::new("faq").stagger(25.0), items)
}

fn contact() -> Timeline {
    let header = rise("contact-header".to_string(), 40.0, IN_VIEW_ONCE);
    let form = Track::new("contact-form", Property::Opacity, vec![0.0, 1.0])
        .trigger(IN_VIEW_ONCE)
        .delay(150.0);
    with_tracks(Timeline::new("contact"), header.into_iter().chain([form]))
}

/// All landing page timelines for a brand.
pub fn landing_timelines(brand: &Brand) -> Vec<Timeline> {
    vec![
        hero(hero_words(brand).len()),
        services(brand.services.len()),
        projects(brand.projects.len()),
        about(),
        faq(brand.faqs.len()),
        contact(),
    ]
}

/// Headline words animated individually.
pub fn hero_words(brand: &Brand) -> Vec<String> {
    brand.tagline.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::brand::BrandPreset;
    use crate::site::timeline::Scheduler;

    #[test]
    fn test_every_repeated_element_has_a_target() {
        let brand = Brand::preset(BrandPreset::Caret);
        let timelines = landing_timelines(&brand);
        let styles = Scheduler::initial_styles(&timelines);

        for i in 0..brand.services.len() {
            assert!(styles.contains_key(&target("service", i)));
        }
        for i in 0..hero_words(&brand).len() {
            assert!(styles.contains_key(&target("hero-word", i)));
        }
        assert!(styles.contains_key("about-image"));
    }

    #[test]
    fn test_initial_frame_is_hidden() {
        let brand = Brand::preset(BrandPreset::Caret);
        let styles = Scheduler::initial_styles(&landing_timelines(&brand));

        assert_eq!(styles["service-0"], "opacity: 0; transform: translate(0px, 60px)");
        assert_eq!(styles["hero-word-0"], "transform: translate(0px, 110px)");
        assert_eq!(
            styles["about-image"],
            "transform: translate(0px, 40px); clip-path: inset(0 0 100% 0)"
        );
    }
}
