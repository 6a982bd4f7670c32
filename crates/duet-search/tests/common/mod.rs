//! Shared fixture: the twelve zodiac signs on the unit circle.
//!
//! Sign `i` sits at `i * 30` degrees, so its embedding is `[cos, sin]` of that
//! angle. Signs 0..6 are in category `前半`, the rest in `後半`.

#![allow(dead_code)]

use duet_core::db::DocumentStore;
use duet_core::model::{DocumentInsert, NewDocument};

pub const FIRST_HALF: &str = "前半";
pub const SECOND_HALF: &str = "後半";

pub const ZODIAC: [(&str, &str); 12] = [
    (
        "牡羊座",
        "3/21-4/19. 主要な星はハマル、シェラタン、メサルシム、アルフェラツ、アダーラで構成される。アルファ星のハマルは羊の頭を表し、ベータ星のシェラタンは羊の角を意味する。",
    ),
    (
        "金牛座",
        "4/20-5/20. 主要な星はアルデバラン、エルナト、ゼータ・タウリ、アルキオネ、マイア、エレクトラ、タイゲタ、メロペ、ケラエノ、ステロペで構成される。プレアデス星団とヒアデス星団を含む。",
    ),
    (
        "双子座",
        "5/21-6/21. 主要な星はカストル、ポルックス、アルヘナ、ワサト、メブスタ、プロプス、テジャット・プリオル、テジャット・ポステリオルで構成される。カストルとポルックスは双子の兄弟を表す。",
    ),
    (
        "蟹座",
        "6/22-7/22. 主要な星はアクベンス、アル・タルフ、イオタ・カンクリ、デルタ・カンクリで構成される。中央にはプレセペ星団（蜂の巣星団）がある。比較的暗い星座で目立たない。",
    ),
    (
        "獅子座",
        "7/23-8/22. 主要な星はレグルス、デネボラ、アルギエバ、ゾスマ、アダフェラ、ラス・エラセド・アウストラリス、ラス・エラセド・ボレアリス、スバルで構成される。レグルスは王の星として知られる。",
    ),
    (
        "乙女座",
        "8/23-9/22. 主要な星はスピカ、ガンマ・ヴィルギニス、イプシロン・ヴィルギニス、デルタ・ヴィルギニス、ベータ・ヴィルギニス、ザヴィヤヴァ、ミンエラウヴァで構成される。スピカは麦の穂を表す。",
    ),
    (
        "天秤座",
        "9/23-10/23. 主要な星はズベン・エル・ゲヌビ、ズベン・エル・シャマリ、ズベン・エル・アクラブ、ガンマ・リブラエ、シグマ・リブラエで構成される。古代は蠍座の一部とされていた。",
    ),
    (
        "蠍座",
        "10/24-11/22. 主要な星はアンタレス、シャウラ、サルガス、イータ・スコルピイ、ゼータ・スコルピイ、ミュー・スコルピイ、イプシロン・スコルピイで構成される。アンタレスは火星のライバルという意味。",
    ),
    (
        "射手座",
        "11/23-12/21. 主要な星はサギッタリウス、ヌンキ、アスケラ、カウス・アウストラリス、カウス・メディウス、カウス・ボレアリス、アルバルダ、アルナスルで構成される。銀河系の中心方向にある。",
    ),
    (
        "山羊座",
        "12/22-1/19. 主要な星はアルゲディ、ダビー、ナシラ、デネブ・アルゲディ、バテン・アルゲディ、オメガ・カプリコルニで構成される。比較的暗い星で構成される山羊の形を表している。",
    ),
    (
        "水瓶座",
        "1/20-2/18. 主要な星はサダルメリク、サダルスウド、スカト、サダクビア、アルバリ、アンカ、シタラで構成される。水を注ぐ人の姿を表し、多くの球状星団がある。",
    ),
    (
        "魚座",
        "2/19-3/20. 主要な星はアル・リシャ、フマル・サマカ、トルクラリウム・セプテントリオナレ、ガンマ・ピスキウム、ベータ・ピスキウムで構成される。二匹の魚がリボンで結ばれた形を表している。",
    ),
];

/// Unit vector at `degrees`.
#[allow(clippy::cast_possible_truncation)]
pub fn unit_at(degrees: f64) -> Vec<f32> {
    let radians = degrees.to_radians();
    vec![radians.cos() as f32, radians.sin() as f32]
}

pub fn zodiac_documents() -> Vec<NewDocument> {
    ZODIAC
        .iter()
        .enumerate()
        .map(|(i, (name, text))| {
            let category = if i < 6 { FIRST_HALF } else { SECOND_HALF };
            NewDocument::new(category, format!("星座：{name}"), *text)
        })
        .collect()
}

pub fn zodiac_inserts() -> Vec<DocumentInsert> {
    zodiac_documents()
        .into_iter()
        .enumerate()
        .map(|(i, doc)| doc.with_embedding(unit_at(f64::from(u32::try_from(i).unwrap_or(0)) * 30.0)))
        .collect()
}

/// A 2-d in-memory store holding the twelve signs, ids 1..=12 in order.
pub fn zodiac_store() -> DocumentStore {
    let mut store = DocumentStore::open_in_memory(2).expect("open store");
    let inserted = store.bulk_insert(&zodiac_inserts()).expect("insert zodiac");
    assert_eq!(inserted, 12);
    store
}
