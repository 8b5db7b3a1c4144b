//! Use-case and example registries.
use crate::list::Feature;

pub struct UseCase {
    pub name: &'static str,
    pub title: &'static str,
    pub features: &'static [Feature],
}

pub const USE_CASES: &[UseCase] = &[
    UseCase {
        name: "simple",
        title: "New list",
        features: &[],
    },
    UseCase {
        name: "todo",
        title: "New to-do list",
        features: &[Feature::Check],
    },
    UseCase {
        name: "poll",
        title: "New poll",
        features: &[Feature::Vote],
    },
    UseCase {
        name: "shopping",
        title: "New shopping list",
        features: &[],
    },
    UseCase {
        name: "meeting-agenda",
        title: "New meeting agenda",
        features: &[],
    },
    UseCase {
        name: "playlist",
        title: "New playlist",
        features: &[Feature::Play],
    },
    UseCase {
        name: "map",
        title: "New map",
        features: &[Feature::Location],
    },
];

pub fn use_case(name: &str) -> Option<&'static UseCase> {
    USE_CASES.iter().find(|use_case| use_case.name == name)
}

pub struct ExampleItem {
    pub title: &'static str,
    pub text: Option<&'static str>,
    pub resource: Option<&'static str>,
    pub location: Option<(&'static str, [f64; 2])>,
    pub checked: bool,
}

impl ExampleItem {
    const fn titled(title: &'static str) -> Self {
        Self {
            title,
            text: None,
            resource: None,
            location: None,
            checked: false,
        }
    }

    const fn text(mut self, text: &'static str) -> Self {
        self.text = Some(text);
        self
    }

    const fn resource(mut self, resource: &'static str) -> Self {
        self.resource = Some(resource);
        self
    }

    const fn located(mut self, name: &'static str, coords: [f64; 2]) -> Self {
        self.location = Some((name, coords));
        self
    }

    const fn checked(mut self) -> Self {
        self.checked = true;
        self
    }
}

pub struct Example {
    pub use_case: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub items: [ExampleItem; 3],
}

pub const EXAMPLE_NOTE: &str =
    "*This example was created just for you, so please feel free to play around.*";

pub const EXAMPLES: &[Example] = &[
    Example {
        use_case: "todo",
        title: "Project tasks",
        description: "Things we need to do to complete our project.",
        items: [
            ExampleItem::titled("Do research").checked(),
            ExampleItem::titled("Create draft"),
            ExampleItem::titled("Write report").text("Summary of the results"),
        ],
    },
    Example {
        use_case: "shopping",
        title: "Kitchen shopping list",
        description: "When you go shopping next time, please bring the items from this list.",
        items: [
            ExampleItem::titled("Soy sauce"),
            ExampleItem::titled("Vegetables").text("Especially tomatoes"),
            ExampleItem::titled("Chocolate (vegan)"),
        ],
    },
    Example {
        use_case: "meeting-agenda",
        title: "Working group agenda",
        description: "We meet on Monday and discuss important issues.",
        items: [
            ExampleItem::titled("Round of introductions"),
            ExampleItem::titled("Lunch poll").text("What will we have for lunch today?"),
            ExampleItem::titled("Next meeting").text("When and where will our next meeting be?"),
        ],
    },
    Example {
        use_case: "playlist",
        title: "Party playlist",
        description: "Songs we want to hear at our get-together tonight.",
        items: [
            ExampleItem::titled("Rick Astley - Never Gonna Give You Up")
                .text("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
                .resource("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            ExampleItem::titled("Rihanna - Diamonds")
                .text("https://www.youtube.com/watch?v=lWA2pjMjpBs")
                .resource("https://www.youtube.com/watch?v=lWA2pjMjpBs"),
            ExampleItem::titled("Did you know?").text(
                "The lyrics for Rihanna's song Diamonds were written by singer-songwriter Sia in just 14 minutes.",
            ),
        ],
    },
    Example {
        use_case: "map",
        title: "Delicious burger places in Berlin",
        description: "Hand-Picked by ourselves. Your favorite is missing? Let us know!",
        items: [
            ExampleItem::titled("Glück to go")
                .text("Website: http://www.glueck-to-go.de/")
                .located(
                    "Friesenstraße 26, 10965 Berlin, Germany",
                    [52.48866, 13.394651],
                ),
            ExampleItem::titled("L’herbivore")
                .text("Website: https://lherbivore.de/")
                .located(
                    "Petersburger Straße 38, 10249 Berlin, Germany",
                    [52.522951, 13.449482],
                ),
            ExampleItem::titled("YELLOW SUNSHINE")
                .text("Website: http://www.yellow-sunshine.de/")
                .located(
                    "Wiener Straße 19, 10999 Berlin, Germany",
                    [52.497561, 13.430773],
                ),
        ],
    },
];

pub fn example(use_case: &str) -> Option<&'static Example> {
    EXAMPLES.iter().find(|example| example.use_case == use_case)
}
