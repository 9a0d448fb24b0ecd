use once_cell::sync::Lazy;

use super::{AutofillRule, Groups, Resolver, Term};
use crate::mapping::TextTable;
use crate::region::Region;

const DIFFICULTY: &[Term] = &[
    Term {
        jp: "初級",
        values: &[
            (Region::CN, "初级"),
            (Region::TW, "初級"),
            (Region::NA, "Beginner"),
            (Region::KR, "초급"),
        ],
    },
    Term {
        jp: "中級",
        values: &[
            (Region::CN, "中级"),
            (Region::TW, "中級"),
            (Region::NA, "Intermediate"),
            (Region::KR, "중급"),
        ],
    },
    Term {
        jp: "上級",
        values: &[
            (Region::CN, "上级"),
            (Region::TW, "上級"),
            (Region::NA, "Advanced"),
            (Region::KR, "상급"),
        ],
    },
    Term {
        jp: "超級",
        values: &[
            (Region::CN, "超级"),
            (Region::TW, "超級"),
            (Region::NA, "Expert"),
            (Region::KR, "초상급"),
        ],
    },
    Term {
        jp: "極級",
        values: &[
            (Region::CN, "极级"),
            (Region::TW, "極級"),
            (Region::NA, "Extreme"),
            (Region::KR, "극급"),
        ],
    },
];

const CLASS_SHORT: &[Term] = &[
    Term {
        jp: "剣",
        values: &[
            (Region::CN, "剑"),
            (Region::TW, "劍"),
            (Region::NA, "Saber"),
            (Region::KR, "세이버"),
        ],
    },
    Term {
        jp: "弓",
        values: &[
            (Region::CN, "弓"),
            (Region::TW, "弓"),
            (Region::NA, "Archer"),
            (Region::KR, "아처"),
        ],
    },
    Term {
        jp: "槍",
        values: &[
            (Region::CN, "枪"),
            (Region::TW, "槍"),
            (Region::NA, "Lancer"),
            (Region::KR, "랜서"),
        ],
    },
    Term {
        jp: "騎",
        values: &[
            (Region::CN, "骑"),
            (Region::TW, "騎"),
            (Region::NA, "Rider"),
            (Region::KR, "라이더"),
        ],
    },
    Term {
        jp: "術",
        values: &[
            (Region::CN, "术"),
            (Region::TW, "術"),
            (Region::NA, "Caster"),
            (Region::KR, "캐스터"),
        ],
    },
    Term {
        jp: "殺",
        values: &[
            (Region::CN, "杀"),
            (Region::TW, "殺"),
            (Region::NA, "Assassin"),
            (Region::KR, "어새신"),
        ],
    },
    Term {
        jp: "狂",
        values: &[
            (Region::CN, "狂"),
            (Region::TW, "狂"),
            (Region::NA, "Berserker"),
            (Region::KR, "버서커"),
        ],
    },
];

const GEM_KIND: &[Term] = &[
    Term {
        jp: "輝石",
        values: &[
            (Region::CN, "辉石"),
            (Region::TW, "輝石"),
            (Region::NA, "Gem"),
            (Region::KR, "휘석"),
        ],
    },
    Term {
        jp: "魔石",
        values: &[
            (Region::CN, "魔石"),
            (Region::TW, "魔石"),
            (Region::NA, "Magic Gem"),
            (Region::KR, "마석"),
        ],
    },
    Term {
        jp: "秘石",
        values: &[
            (Region::CN, "秘石"),
            (Region::TW, "秘石"),
            (Region::NA, "Secret Gem"),
            (Region::KR, "비석"),
        ],
    },
];

const STATUE_KIND: &[Term] = &[
    Term {
        jp: "ピース",
        values: &[
            (Region::CN, "棋子"),
            (Region::TW, "棋子"),
            (Region::NA, "Piece"),
            (Region::KR, "피스"),
        ],
    },
    Term {
        jp: "モニュメント",
        values: &[
            (Region::CN, "银像"),
            (Region::TW, "銀像"),
            (Region::NA, "Monument"),
            (Region::KR, "모뉴먼트"),
        ],
    },
];

const SPOT_OR_QUEST: &[TextTable] = &[TextTable::SpotNames, TextTable::QuestNames];

/// Curated rules, tried in order.
pub static DEFAULT_RULES: Lazy<Vec<AutofillRule>> = Lazy::new(|| {
    vec![
        AutofillRule::new(
            TextTable::QuestNames,
            r"^強化クエスト (.+) (\d+)$",
            Groups::Positional(vec![Resolver::Table(TextTable::SvtNames), Resolver::Verbatim]),
            vec![
                (Region::CN, "强化关卡 {0} {1}"),
                (Region::TW, "強化關卡 {0} {1}"),
                (Region::NA, "Rank Up Quest: {0} {1}"),
                (Region::KR, "강화 퀘스트 {0} {1}"),
            ],
        ),
        AutofillRule::new(
            TextTable::QuestNames,
            r"^強化クエスト (.+)$",
            Groups::Positional(vec![Resolver::Table(TextTable::SvtNames)]),
            vec![
                (Region::CN, "强化关卡 {0}"),
                (Region::TW, "強化關卡 {0}"),
                (Region::NA, "Rank Up Quest: {0}"),
                (Region::KR, "강화 퀘스트 {0}"),
            ],
        ),
        AutofillRule::new(
            TextTable::QuestNames,
            r"^(?P<spot>.+?) (?P<rank>初級|中級|上級|超級|極級)$",
            Groups::Named(vec![
                ("spot", Resolver::Tables(SPOT_OR_QUEST)),
                ("rank", Resolver::Enumeration(DIFFICULTY)),
            ]),
            vec![
                (Region::CN, "{spot} {rank}"),
                (Region::TW, "{spot} {rank}"),
                (Region::NA, "{spot} {rank}"),
                (Region::KR, "{spot} {rank}"),
            ],
        ),
        AutofillRule::new(
            TextTable::EventNames,
            r"^復刻:(.+) ライト版$",
            Groups::Positional(vec![Resolver::Table(TextTable::EventNames)]),
            vec![
                (Region::CN, "复刻:{0} 轻量版"),
                (Region::TW, "復刻:{0} 輕量版"),
                (Region::NA, "[Rerun] {0} Lite"),
                (Region::KR, "복각: {0} 라이트 버전"),
            ],
        ),
        AutofillRule::new(
            TextTable::EventNames,
            r"^復刻:(.+)$",
            Groups::Positional(vec![Resolver::Table(TextTable::EventNames)]),
            vec![
                (Region::CN, "复刻:{0}"),
                (Region::TW, "復刻:{0}"),
                (Region::NA, "[Rerun] {0}"),
                (Region::KR, "복각: {0}"),
            ],
        ),
        AutofillRule::new(
            TextTable::ItemNames,
            r"^(?P<class>剣|弓|槍|騎|術|殺|狂)の(?P<gem>輝石|魔石|秘石)$",
            Groups::Named(vec![
                ("class", Resolver::Enumeration(CLASS_SHORT)),
                ("gem", Resolver::Enumeration(GEM_KIND)),
            ]),
            vec![
                (Region::CN, "{class}之{gem}"),
                (Region::TW, "{class}之{gem}"),
                (Region::NA, "{gem} of {class}"),
                (Region::KR, "{class}의 {gem}"),
            ],
        ),
        AutofillRule::new(
            TextTable::ItemNames,
            r"^(?P<class>剣|弓|槍|騎|術|殺|狂)の(?P<kind>ピース|モニュメント)$",
            Groups::Named(vec![
                ("class", Resolver::Enumeration(CLASS_SHORT)),
                ("kind", Resolver::Enumeration(STATUE_KIND)),
            ]),
            vec![
                (Region::CN, "{class}阶{kind}"),
                (Region::TW, "{class}階{kind}"),
                (Region::NA, "{class} {kind}"),
                (Region::KR, "{class} {kind}"),
            ],
        ),
    ]
    .into_iter()
    .collect::<anyhow::Result<Vec<_>>>()
    .expect("default autofill rules")
});
