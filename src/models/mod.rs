pub mod user;
pub mod ingredient;
pub mod stock;
pub mod student;
pub mod attendance;
pub mod menu;

// Re-export only the types we actually use
pub use user::{
    CreateUser, UpdateUser, UserDisplay, UserSummary,
    LoginRequest, LoginResponse,
    Role, RoleInput, Permission, RolePermissionView, AssignPermission,
};
pub use ingredient::{Ingredient, IngredientInput};
pub use stock::{
    MovementType, AlertType,
    StockMovement, CreateStockMovement, StockMovementDisplay,
    StockAlert, StockAlertDisplay,
};
pub use student::{
    Student, StudentInput,
    AllergenProfileDisplay, AllergenProfileInput,
};
pub use attendance::{MealType, Attendance, AttendanceInput, AttendanceDisplay};
pub use menu::{
    Recipe, RecipeDisplay, RecipeInput,
    Supplier, SupplierInput,
    SupplierOrder, SupplierOrderDisplay, SupplierOrderInput, OrderItemInput,
    MenuPlan, MenuPlanDisplay, MenuPlanInput,
};
