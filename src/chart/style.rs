// ============================================================================
// ChartStyle - Apparence du graphique
// ============================================================================
// Couleurs, polices et dimensions du rendu. C'est une valeur immuable passée
// au renderer : deux rendus concurrents ne partagent aucun état global.
// ============================================================================

use plotters::style::RGBColor;

/// Style du graphique en chandeliers
#[derive(Debug, Clone, PartialEq)]
pub struct ChartStyle {
    /// Corps et volume des chandelles haussières (close >= open)
    pub up_color: RGBColor,

    /// Corps et volume des chandelles baissières
    pub down_color: RGBColor,

    /// Mèches
    pub wick_color: RGBColor,

    /// Fond de la figure et des panneaux
    pub background: RGBColor,

    /// Axes et texte
    pub foreground: RGBColor,

    /// Lignes de grille (pointillés)
    pub grid_color: RGBColor,

    /// Longueur d'un tiret et de l'espace qui suit, en pixels
    pub grid_dash: (u32, u32),

    /// Couleurs des moyennes mobiles, utilisées dans l'ordre puis en boucle
    pub moving_average_colors: Vec<RGBColor>,

    /// Famille de police (résolue par plotters)
    pub font_family: String,

    /// Tailles de police en points
    pub title_font_size: f64,
    pub axis_font_size: f64,
    pub label_font_size: f64,

    /// Taille de la figure en pouces, et résolution
    pub figure_size: (f64, f64),
    pub dpi: f64,

    /// Part de la hauteur réservée au panneau de volume
    pub volume_ratio: f64,

    /// Largeur d'un corps de chandelle, en fraction de l'espacement
    pub body_width: f64,
}

impl Default for ChartStyle {
    /// Thème clair : vert/rouge, mèches noires, grille grise en pointillés
    fn default() -> Self {
        Self {
            up_color: RGBColor(0x26, 0xa6, 0x9a),
            down_color: RGBColor(0xef, 0x53, 0x50),
            wick_color: RGBColor(0, 0, 0),
            background: RGBColor(0xff, 0xff, 0xff),
            foreground: RGBColor(0, 0, 0),
            grid_color: RGBColor(0xe6, 0xe6, 0xe6),
            grid_dash: (6, 4),
            moving_average_colors: vec![
                RGBColor(0x1f, 0x77, 0xb4),
                RGBColor(0xff, 0x7f, 0x0e),
                RGBColor(0x94, 0x67, 0xbd),
                RGBColor(0x8c, 0x56, 0x4b),
                RGBColor(0xe3, 0x77, 0xc2),
            ],
            font_family: "sans-serif".to_string(),
            title_font_size: 12.0,
            axis_font_size: 10.0,
            label_font_size: 9.0,
            figure_size: (12.0, 6.0),
            dpi: 150.0,
            volume_ratio: 0.3,
            body_width: 0.6,
        }
    }
}

impl ChartStyle {
    /// Dimensions du bitmap en pixels (12x6 pouces à 150 dpi = 1800x900)
    pub fn pixel_size(&self) -> (u32, u32) {
        let (w, h) = self.figure_size;
        (
            (w * self.dpi).round().max(1.0) as u32,
            (h * self.dpi).round().max(1.0) as u32,
        )
    }

    /// Convertit une taille en points vers des pixels
    pub fn points_to_pixels(&self, points: f64) -> f64 {
        points * self.dpi / 72.0
    }

    /// Couleur de la n-ième moyenne mobile
    pub fn moving_average_color(&self, index: usize) -> RGBColor {
        if self.moving_average_colors.is_empty() {
            return self.foreground;
        }
        self.moving_average_colors[index % self.moving_average_colors.len()]
    }
}
