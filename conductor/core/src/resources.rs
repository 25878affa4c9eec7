//! Support Resources and Topics
//!
//! Static content shown next to the chat: the directory of help lines and
//! websites, and the topics of the "discover" section. Surfaces render
//! these; the only logic is category filtering and turning a contact into
//! something the platform can open.

use serde::{Deserialize, Serialize};

use crate::avatar::Color;

/// Category that matches every resource
pub const ALL_CATEGORIES: &str = "Todos";

/// Emergency number link
pub const EMERGENCY_URI: &str = "tel:911";

/// How to reach a resource
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Contact {
    /// Phone line, as printed
    Phone(String),
    /// Website
    Web(String),
}

/// One entry in the directory
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Display name
    pub title: String,
    /// What the resource offers
    pub description: String,
    /// Directory category
    pub category: String,
    /// How to reach it
    pub contact: Contact,
}

impl Resource {
    fn phone(title: &str, description: &str, category: &str, number: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            category: category.to_string(),
            contact: Contact::Phone(number.to_string()),
        }
    }

    fn web(title: &str, description: &str, category: &str, url: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            category: category.to_string(),
            contact: Contact::Web(url.to_string()),
        }
    }

    /// Link the platform opens for this resource
    #[must_use]
    pub fn contact_uri(&self) -> String {
        match &self.contact {
            Contact::Phone(number) => {
                let digits: String = number
                    .chars()
                    .filter(|c| c.is_ascii_digit() || *c == '+')
                    .collect();
                format!("tel:{digits}")
            }
            Contact::Web(url) => url.clone(),
        }
    }
}

const CRISIS: &str = "Apoyo en situaciones de crisis";
const SAPTEL: &str =
    "El SAPTEL es un servicio de apoyo, consejo psicológico y de intervención en crisis";
const SIN_VIOLENCIA: &str = "Se proporciona asesoría jurídica y atención psicológica a mujeres \
en situación de violencia de género";

/// The built-in directory
#[must_use]
pub fn catalog() -> Vec<Resource> {
    vec![
        Resource::phone(
            "Línea Nacional de Prevención del Suicidio",
            "Asistencia gratuita y confidencial las 24 horas, los 7 días de la semana, para \
             personas en situación de necesidad.",
            CRISIS,
            "800 900 8432",
        ),
        Resource::web(
            "Asociación Mexicana de Suicidología, A.C.",
            "Información acerca del suicidio y autoayuda",
            CRISIS,
            "https://suicidologia.mx/necesitas-ayuda/",
        ),
        Resource::phone("SAPTEL", SAPTEL, CRISIS, "55 52 59 81 21"),
        Resource::web("Saptel.org.mx", SAPTEL, CRISIS, "https://www.saptel.org.mx/"),
        Resource::web(
            "Escuelalibredeviolencia.sep.gob.mx",
            "Información y recursos sobre la prevención del acoso escolar",
            "Bullying",
            "https://escuelalibredeviolencia.sep.gob.mx/",
        ),
        Resource::phone("Línea Sin Violencia", SIN_VIOLENCIA, "Salud sexual", "800 10 84 053"),
        Resource::web(
            "Línea Sin Violencia",
            SIN_VIOLENCIA,
            "Salud sexual",
            "https://semujeres.edomex.gob.mx/linea_atencion_por_violencia",
        ),
        Resource::web(
            "Planned Parenthood",
            "Información y servicios de salud sexual",
            "Salud sexual",
            "https://www.plannedparenthood.org/es",
        ),
        Resource::web(
            "Cecyteorienta.com",
            "Un sitio web para informarte acerca de diversos temas",
            "Cecy",
            "https://www.cecyteorienta.com/",
        ),
    ]
}

/// `"Todos"` followed by each category in first-appearance order
#[must_use]
pub fn categories(resources: &[Resource]) -> Vec<String> {
    let mut out = vec![ALL_CATEGORIES.to_string()];
    for resource in resources {
        if !out.contains(&resource.category) {
            out.push(resource.category.clone());
        }
    }
    out
}

/// Resources in `category` (`"Todos"` keeps everything)
#[must_use]
pub fn filter<'a>(resources: &'a [Resource], category: &str) -> Vec<&'a Resource> {
    resources
        .iter()
        .filter(|r| category == ALL_CATEGORIES || r.category == category)
        .collect()
}

/// Topics of the discover section
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    /// Who Cecy is
    CecyPresentation,
    /// Addiction prevention
    Addictions,
    /// School bullying
    Bullying,
    /// Emotional wellbeing
    MentalHealth,
    /// Responsible sexuality
    SexualHealth,
}

impl Topic {
    /// All topics in display order
    pub const ALL: [Topic; 5] = [
        Topic::CecyPresentation,
        Topic::Addictions,
        Topic::Bullying,
        Topic::MentalHealth,
        Topic::SexualHealth,
    ];

    /// Card title
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::CecyPresentation => "Conoce a Cecy",
            Self::Addictions => "Adicciones",
            Self::Bullying => "Bullying",
            Self::MentalHealth => "Salud Mental",
            Self::SexualHealth => "Salud Sexual",
        }
    }

    /// Card subtitle
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::CecyPresentation => "Descubre quién es tu compañera de apoyo y orientación",
            Self::Addictions => "Información sobre prevención y tratamiento de adicciones",
            Self::Bullying => "Cómo identificar, prevenir y actuar ante el acoso escolar",
            Self::MentalHealth => "Bienestar emocional y psicológico para una vida plena",
            Self::SexualHealth => "Información sobre sexualidad responsable y saludable",
        }
    }

    /// Card accent
    #[must_use]
    pub fn color(self) -> Color {
        match self {
            Self::CecyPresentation => Color::rgb(0x53, 0xAB, 0x32),
            Self::Addictions => Color::rgb(0xEF, 0x44, 0x44),
            Self::Bullying => Color::rgb(0xF5, 0x9E, 0x0B),
            Self::MentalHealth => Color::rgb(0x8B, 0x5C, 0xF6),
            Self::SexualHealth => Color::rgb(0xEC, 0x48, 0x99),
        }
    }

    /// Route segment, e.g. `mental-health`
    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            Self::CecyPresentation => "cecy-presentation",
            Self::Addictions => "addictions",
            Self::Bullying => "bullying",
            Self::MentalHealth => "mental-health",
            Self::SexualHealth => "sexual-health",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_categories_in_first_appearance_order() {
        assert_eq!(
            categories(&catalog()),
            vec!["Todos", CRISIS, "Bullying", "Salud sexual", "Cecy"]
        );
    }

    #[test]
    fn test_filter() {
        let all = catalog();
        assert_eq!(filter(&all, ALL_CATEGORIES).len(), all.len());
        assert_eq!(filter(&all, "Bullying").len(), 1);
        assert_eq!(filter(&all, "Salud sexual").len(), 3);
        assert!(filter(&all, "Deportes").is_empty());
    }

    #[test]
    fn test_contact_uri() {
        let all = catalog();
        assert_eq!(all[0].contact_uri(), "tel:8009008432");
        assert_eq!(all[1].contact_uri(), "https://suicidologia.mx/necesitas-ayuda/");
    }

    #[test]
    fn test_topic_slugs_match_serde() {
        for topic in Topic::ALL {
            let json = serde_json::to_string(&topic).unwrap();
            assert_eq!(json, format!("\"{}\"", topic.slug()));
        }
    }
}
