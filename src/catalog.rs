//! Static topic catalog. Read-only after startup.

use ratatui::style::Color;

use crate::models::{Topic, TopicCategory, TopicIcon};

/// The grade 3 first-semester curriculum units.
pub const TOPICS: [Topic; 6] = [
    Topic {
        id: "mixed-ops",
        title: "混合运算",
        description: "掌握加减乘除的运算顺序，打败“小括号”怪兽！",
        icon: TopicIcon::Calculator,
        color: Color::Magenta,
        category: TopicCategory::Calculation,
    },
    Topic {
        id: "perimeter",
        title: "周长",
        description: "给图形围上篱笆，计算长方形和正方形的周长。",
        icon: TopicIcon::Square,
        color: Color::Blue,
        category: TopicCategory::Geometry,
    },
    Topic {
        id: "calendar",
        title: "年、月、日",
        description: "探索时间的奥秘，认识大月、小月和平年、闰年。",
        icon: TopicIcon::Calendar,
        color: Color::Green,
        category: TopicCategory::Concept,
    },
    Topic {
        id: "multiplication",
        title: "乘与除",
        description: "多位数乘一位数，整十、整百数的乘除法。",
        icon: TopicIcon::Times,
        color: Color::LightMagenta,
        category: TopicCategory::Calculation,
    },
    Topic {
        id: "observation",
        title: "观察物体",
        description: "从正面、侧面、上面看一看，立体的世界真奇妙。",
        icon: TopicIcon::Cube,
        color: Color::LightRed,
        category: TopicCategory::Geometry,
    },
    Topic {
        id: "olympiad-logic",
        title: "趣味奥数",
        description: "植树问题、简单的推理，挑战你的超级大脑！",
        icon: TopicIcon::Trophy,
        color: Color::Yellow,
        category: TopicCategory::Logic,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_ids_are_unique() {
        for (i, a) in TOPICS.iter().enumerate() {
            for b in &TOPICS[i + 1..] {
                assert_ne!(a.id, b.id);
            }
        }
    }

    #[test]
    fn every_topic_has_content() {
        for topic in &TOPICS {
            assert!(!topic.title.is_empty());
            assert!(!topic.description.is_empty());
        }
    }
}
