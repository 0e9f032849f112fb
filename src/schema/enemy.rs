use serde::{Deserialize, Serialize};

/// An enemy template. Each encounter copies the numbers it needs and never
/// writes back to the template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    pub id: String,
    pub name: String,
    pub hp: u32,
    pub max_hp: u32,
    pub damage: u32,
    pub stamina: u32,
    pub max_stamina: u32,
    pub xp_reward: u32,
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enemy_from_ron() {
        let enemy: Enemy = ron::from_str(
            r#"(
                id: "celebi",
                name: "Mehmet Celebi",
                hp: 200,
                max_hp: 200,
                damage: 25,
                stamina: 100,
                max_stamina: 100,
                xp_reward: 500,
                description: "Lord of the Cracked Skull.",
            )"#,
        )
        .unwrap();
        assert_eq!(enemy.max_hp, 200);
        assert_eq!(enemy.xp_reward, 500);
        assert!(enemy.image.is_none());
    }
}
