//! Sample content for a fresh installation.
//!
//! Every record is looked up by slug first, so running the seed twice leaves
//! the second run with nothing to create. Writes go through the admin
//! services and therefore through cache invalidation.

use std::collections::HashMap;

use tracing::info;
use uuid::Uuid;

use crate::application::admin::{
    AdminBlogService, AdminError, AdminGalleryService, AlbumInput, CategoryInput, PostInput,
    TagInput,
};
use crate::domain::types::ThemeColor;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub created: usize,
    pub existing: usize,
}

impl SeedReport {
    fn record(&mut self, kind: &'static str, slug: &str, created: bool) {
        if created {
            self.created += 1;
            info!(kind, slug, "Seed record created");
        } else {
            self.existing += 1;
            info!(kind, slug, "Seed record already present");
        }
    }
}

struct SeedCategory {
    name: &'static str,
    slug: &'static str,
    description: &'static str,
    sort_order: i32,
}

const CATEGORIES: [SeedCategory; 4] = [
    SeedCategory {
        name: "山水意境",
        slug: "landscape",
        description: "寄情山水，以光影描绘东方意境",
        sort_order: 1,
    },
    SeedCategory {
        name: "器物特写",
        slug: "still-life",
        description: "静观器物，于细微处见匠心",
        sort_order: 2,
    },
    SeedCategory {
        name: "光影实验",
        slug: "experimental",
        description: "探索光与影的更多可能",
        sort_order: 3,
    },
    SeedCategory {
        name: "随笔",
        slug: "essay",
        description: "关于摄影与生活的零星思考",
        sort_order: 4,
    },
];

const TAGS: [(&str, &str); 6] = [
    ("风光", "fengguang"),
    ("人像", "renxiang"),
    ("黑白", "heibai"),
    ("胶片", "jiaopian"),
    ("街拍", "jiepai"),
    ("静物", "jingwu"),
];

const ALBUMS: [(&str, &str, &str, ThemeColor); 3] = [
    (
        "西湖四季",
        "west-lake",
        "记录西湖春夏秋冬的不同韵味",
        ThemeColor::Indigo,
    ),
    (
        "古镇时光",
        "ancient-town",
        "漫步江南古镇，感受岁月痕迹",
        ThemeColor::Amber,
    ),
    (
        "山川云雾",
        "mountains",
        "黄山、泰山的云海日出",
        ThemeColor::Raven,
    ),
];

struct SeedPost {
    title: &'static str,
    slug: &'static str,
    category: &'static str,
    excerpt: &'static str,
    content: &'static str,
    is_photography: bool,
}

const POSTS: [SeedPost; 5] = [
    SeedPost {
        title: "春日西湖",
        slug: "spring-west-lake",
        category: "landscape",
        excerpt: "三月春风拂面，西湖柳绿桃红，正是踏青好时节。",
        content: "清晨六点，薄雾还未散去，断桥边已有早起的游人。\n\n\
                  苏堤上的柳枝刚抽出新芽，在晨光中透着淡淡的鹅黄。\
                  远处的保俶塔若隐若现，宛如一幅水墨画卷。",
        is_photography: true,
    },
    SeedPost {
        title: "宋代美学与摄影",
        slug: "song-aesthetics-photography",
        category: "essay",
        excerpt: "探讨宋代美学理念对现代摄影的启发与影响。",
        content: "宋代是中国美学的高峰，其简约、含蓄、意境深远的审美追求，\
                  对今天的摄影创作依然有着深刻的启发。\n\n\
                  留白、虚实与意境，是宋画留给摄影者最宝贵的三件礼物。",
        is_photography: false,
    },
    SeedPost {
        title: "古村落的清晨",
        slug: "ancient-village-morning",
        category: "still-life",
        excerpt: "徽派古村的晨光，唤醒了沉睡的白墙黛瓦。",
        content: "天刚蒙蒙亮，宏村还笼罩在一片静谧之中。\n\n\
                  第一缕阳光越过马头墙，落在月沼的水面上，\
                  白墙黛瓦的倒影随着微风轻轻晃动。",
        is_photography: true,
    },
    SeedPost {
        title: "黑白胶片的魅力",
        slug: "black-white-film",
        category: "experimental",
        excerpt: "回归黑白胶片，感受纯粹的光影魅力。",
        content: "在数码时代，为什么还要拍黑白胶片？\n\n\
                  去掉色彩之后，画面只剩下光影、线条与质感。\
                  每一次按下快门都需要更多的思考与等待。",
        is_photography: false,
    },
    SeedPost {
        title: "黄山云海",
        slug: "huangshan-cloud-sea",
        category: "landscape",
        excerpt: "登黄山观云海，感受大自然的壮丽与神奇。",
        content: "凌晨四点从光明顶出发，在寒风中等待日出。\n\n\
                  云海在脚下翻涌，奇松怪石时隐时现，\
                  那一刻才明白古人为何说黄山归来不看岳。",
        is_photography: true,
    },
];

/// Creates whatever part of the sample content is missing.
pub async fn seed_sample_content(
    blog: &AdminBlogService,
    gallery: &AdminGalleryService,
) -> Result<SeedReport, AdminError> {
    let mut report = SeedReport::default();

    let mut category_ids: HashMap<&str, Uuid> = HashMap::new();
    for seed in &CATEGORIES {
        let (category, created) = blog
            .get_or_create_category(CategoryInput {
                name: seed.name.to_string(),
                slug: Some(seed.slug.to_string()),
                description: seed.description.to_string(),
                sort_order: seed.sort_order,
            })
            .await?;
        report.record("category", &category.slug, created);
        category_ids.insert(seed.slug, category.id);
    }

    let mut tag_ids = Vec::with_capacity(TAGS.len());
    for (name, slug) in TAGS {
        let (tag, created) = blog
            .get_or_create_tag(TagInput {
                name: name.to_string(),
                slug: Some(slug.to_string()),
            })
            .await?;
        report.record("tag", &tag.slug, created);
        tag_ids.push(tag.id);
    }

    for (title, slug, description, theme_color) in ALBUMS {
        let (album, created) = gallery
            .get_or_create_album(AlbumInput {
                title: title.to_string(),
                slug: Some(slug.to_string()),
                description: description.to_string(),
                theme_color,
                is_featured: true,
                ..Default::default()
            })
            .await?;
        report.record("album", &album.slug, created);
    }

    for (index, seed) in POSTS.iter().enumerate() {
        let (post, created) = blog
            .get_or_create_post(PostInput {
                slug: Some(seed.slug.to_string()),
                excerpt: seed.excerpt.to_string(),
                category_id: category_ids.get(seed.category).copied(),
                tag_ids: seed_tags_for(index, &tag_ids),
                is_photography: seed.is_photography,
                ..PostInput::new(seed.title, seed.content)
            })
            .await?;
        report.record("post", &post.slug, created);
    }

    info!(
        created = report.created,
        existing = report.existing,
        "Sample content seeded"
    );
    Ok(report)
}

/// Two tags per post, rotating through the tag list.
fn seed_tags_for(index: usize, tag_ids: &[Uuid]) -> Vec<Uuid> {
    if tag_ids.is_empty() {
        return Vec::new();
    }
    let first = (index * 2) % tag_ids.len();
    let second = (first + 1) % tag_ids.len();
    let mut ids = vec![tag_ids[first]];
    if second != first {
        ids.push(tag_ids[second]);
    }
    ids
}
