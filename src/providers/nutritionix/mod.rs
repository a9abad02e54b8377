pub mod nutritionix;
